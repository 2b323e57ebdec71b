//! 姿态数据模型

use crate::angle::Angle;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::btree_map;

/// 舵机通道 ID
pub type ChannelId = u32;

/// 姿态：一组命名的目标角度
///
/// - 每个通道最多出现一次（`BTreeMap` 保证键唯一）
/// - 不必覆盖所有通道，未提及的通道保持原目标
/// - 构造后不可变；需要修改时构造新的 `Pose`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pose {
    name: String,
    angles: BTreeMap<ChannelId, Angle>,
}

impl Pose {
    /// 创建姿态
    ///
    /// 重复的通道 ID 以最后一次出现为准。
    pub fn new(
        name: impl Into<String>,
        angles: impl IntoIterator<Item = (ChannelId, Angle)>,
    ) -> Self {
        Self {
            name: name.into(),
            angles: angles.into_iter().collect(),
        }
    }

    /// 姿态名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 全部角度
    pub fn angles(&self) -> &BTreeMap<ChannelId, Angle> {
        &self.angles
    }

    /// 指定通道的角度
    pub fn get(&self, id: ChannelId) -> Option<Angle> {
        self.angles.get(&id).copied()
    }

    /// 通道数量
    pub fn len(&self) -> usize {
        self.angles.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.angles.is_empty()
    }

    /// 按通道 ID 升序迭代
    pub fn iter(&self) -> impl Iterator<Item = (ChannelId, Angle)> + '_ {
        self.angles.iter().map(|(&id, &angle)| (id, angle))
    }

    /// 以新名称构造一个相同角度的姿态
    pub fn with_name(&self, name: impl Into<String>) -> Pose {
        Pose {
            name: name.into(),
            angles: self.angles.clone(),
        }
    }
}

impl<'a> IntoIterator for &'a Pose {
    type Item = (&'a ChannelId, &'a Angle);
    type IntoIter = btree_map::Iter<'a, ChannelId, Angle>;

    fn into_iter(self) -> Self::IntoIter {
        self.angles.iter()
    }
}
