//! 角度类型
//!
//! 设备原生单位为 0.1°，内部用 `i32` 存储，保证步进运算是精确的整数运算。

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, Neg, Sub};

/// 角度（单位：0.1°）
///
/// 所有进入系统的数值都会四舍五入到 0.1°，因此线路上不会出现超过一位小数的歧义。
///
/// # 示例
///
/// ```rust
/// use servolink_protocol::Angle;
///
/// let a = Angle::from_degrees(90.04).unwrap();
/// assert_eq!(a, Angle::from_tenths(900));
/// assert_eq!(a.to_string(), "90.0");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Angle(i32);

impl Angle {
    /// 0°
    pub const ZERO: Angle = Angle(0);

    /// 从 0.1° 计数构造
    pub const fn from_tenths(tenths: i32) -> Self {
        Angle(tenths)
    }

    /// 从整数度构造
    pub const fn from_whole_degrees(degrees: i16) -> Self {
        Angle(degrees as i32 * 10)
    }

    /// 从浮点度数构造（四舍五入到 0.1°）
    ///
    /// NaN/无穷返回 `None`；超出 `i32` 表示范围的有限值饱和到边界，
    /// 由通道注册表负责最终限幅。
    pub fn from_degrees(degrees: f64) -> Option<Self> {
        if !degrees.is_finite() {
            return None;
        }
        let tenths = (degrees * 10.0).round();
        Some(Angle(tenths.clamp(i32::MIN as f64, i32::MAX as f64) as i32))
    }

    /// 0.1° 计数
    pub const fn tenths(self) -> i32 {
        self.0
    }

    /// 转换为浮点度数
    pub fn degrees(self) -> f64 {
        self.0 as f64 / 10.0
    }

    /// 绝对值
    pub fn abs(self) -> Self {
        Angle(self.0.saturating_abs())
    }

    /// 符号（-1, 0, 1）
    pub fn signum(self) -> i32 {
        self.0.signum()
    }

    /// 限幅到闭区间 `[min, max]`
    ///
    /// 调用方保证 `min <= max`。
    pub fn clamp_to(self, min: Angle, max: Angle) -> Self {
        Angle(self.0.clamp(min.0, max.0))
    }

    /// 是否为正值
    pub fn is_positive(self) -> bool {
        self.0 > 0
    }
}

impl Add for Angle {
    type Output = Angle;

    fn add(self, rhs: Angle) -> Angle {
        Angle(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Angle {
    type Output = Angle;

    fn sub(self, rhs: Angle) -> Angle {
        Angle(self.0.saturating_sub(rhs.0))
    }
}

impl Neg for Angle {
    type Output = Angle;

    fn neg(self) -> Angle {
        Angle(self.0.saturating_neg())
    }
}

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.degrees())
    }
}

impl Serialize for Angle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.degrees())
    }
}

impl<'de> Deserialize<'de> for Angle {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let degrees = f64::deserialize(deserializer)?;
        Angle::from_degrees(degrees)
            .ok_or_else(|| D::Error::custom(format!("angle is not a finite number: {}", degrees)))
    }
}
