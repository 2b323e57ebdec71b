//! 输入验证模块
//!
//! 命令行参数到协议类型的转换

use anyhow::{Context, Result, bail};
use servolink_protocol::{Angle, ChannelId};
use std::collections::BTreeSet;

/// 解析角度（度）
///
/// 用作 clap 的 `value_parser`。
pub fn parse_angle(s: &str) -> Result<Angle> {
    let degrees: f64 = s
        .trim()
        .parse()
        .with_context(|| format!("无效的角度: {:?}", s))?;
    Angle::from_degrees(degrees).with_context(|| format!("角度必须是有限数: {}", s))
}

/// 解析角度列表
///
/// 格式：`ID=角度`，逗号分隔，例如 `0=90,1=45.5`
///
/// # 错误
/// 如果：
/// - 某一项缺少 `=`
/// - 通道 ID 不是非负整数
/// - 角度无效
/// - 同一通道出现多次
/// - 列表为空
pub fn parse_angle_list(s: &str) -> Result<Vec<(ChannelId, Angle)>> {
    let mut seen = BTreeSet::new();
    let mut angles = Vec::new();

    for item in s.split(',').map(str::trim).filter(|item| !item.is_empty()) {
        let (id, angle) = item
            .split_once('=')
            .with_context(|| format!("格式应为 ID=角度，得到 {:?}", item))?;
        let id: ChannelId = id
            .trim()
            .parse()
            .with_context(|| format!("无效的通道 ID: {:?}", id))?;
        let angle = parse_angle(angle)?;

        if !seen.insert(id) {
            bail!("通道 {} 重复出现", id);
        }
        angles.push((id, angle));
    }

    if angles.is_empty() {
        bail!("角度列表为空");
    }
    Ok(angles)
}
