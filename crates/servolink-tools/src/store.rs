//! # 姿态存储
//!
//! 命名姿态的持久化。主机端使用，控制器端不涉及。
//!
//! ## 文件格式
//!
//! 单个 JSON 文档，以姿态名为键：
//!
//! ```json
//! {
//!   "stand": { "0": 90.0, "1": 45.0 },
//!   "sit":   { "Servo 1": 120.0 }
//! }
//! ```
//!
//! 通道键为十进制通道 ID；兼容旧版 GUI 写出的 `"Servo N"`（从 1 开始编号，读入为通道 `N-1`）。
//! 保存时统一写成十进制 ID。

use servolink_protocol::{Angle, ChannelId, Pose};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// 旧版通道键前缀
const LEGACY_KEY_PREFIX: &str = "Servo ";

/// 磁盘上的文档结构
type Document = BTreeMap<String, BTreeMap<String, f64>>;

/// 姿态存储错误
#[derive(Error, Debug)]
pub enum PoseStoreError {
    /// 姿态不存在
    #[error("Pose not found: {0}")]
    NotFound(String),

    /// 姿态名为空
    #[error("Invalid pose name: {0:?}")]
    InvalidName(String),

    /// 读写失败
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// 文档无法序列化或解析
    #[error("Invalid pose document: {0}")]
    Format(String),
}

/// 姿态存储 Trait
pub trait PoseStore {
    /// 按名称加载姿态
    ///
    /// # 错误
    ///
    /// 名称不存在时返回 [`PoseStoreError::NotFound`]。
    fn load(&self, name: &str) -> Result<Pose, PoseStoreError>;

    /// 保存姿态（同名覆盖）
    fn save(&mut self, pose: &Pose) -> Result<(), PoseStoreError>;

    /// 所有姿态名（字典序）
    fn list(&self) -> Vec<String>;
}

fn validate_name(name: &str) -> Result<(), PoseStoreError> {
    if name.trim().is_empty() {
        return Err(PoseStoreError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// 内存姿态存储
///
/// # 示例
///
/// ```rust
/// use servolink_protocol::{Angle, Pose};
/// use servolink_tools::{MemoryPoseStore, PoseStore};
///
/// let mut store = MemoryPoseStore::new();
/// store
///     .save(&Pose::new("stand", [(0, Angle::from_whole_degrees(90))]))
///     .unwrap();
/// assert_eq!(store.list(), vec!["stand".to_string()]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryPoseStore {
    poses: BTreeMap<String, Pose>,
}

impl MemoryPoseStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }
}

impl PoseStore for MemoryPoseStore {
    fn load(&self, name: &str) -> Result<Pose, PoseStoreError> {
        validate_name(name)?;
        self.poses
            .get(name)
            .cloned()
            .ok_or_else(|| PoseStoreError::NotFound(name.to_string()))
    }

    fn save(&mut self, pose: &Pose) -> Result<(), PoseStoreError> {
        validate_name(pose.name())?;
        self.poses.insert(pose.name().to_string(), pose.clone());
        Ok(())
    }

    fn list(&self) -> Vec<String> {
        self.poses.keys().cloned().collect()
    }
}

/// JSON 文件姿态存储
///
/// 打开时整体读入内存；每次保存都重写整个文件（先写临时文件再 rename，
/// 中途失败不会留下半个文件）。
///
/// 文件不存在或无法解析时以空存储打开并记录告警，下一次保存会覆盖它。
#[derive(Debug)]
pub struct JsonFilePoseStore {
    path: PathBuf,
    poses: BTreeMap<String, Pose>,
}

impl JsonFilePoseStore {
    /// 打开存储文件
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let poses = match fs::read_to_string(&path) {
            Ok(content) => parse_document(&content).unwrap_or_else(|e| {
                warn!("Pose file {} unreadable, starting empty: {}", path.display(), e);
                BTreeMap::new()
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Pose file {} does not exist yet", path.display());
                BTreeMap::new()
            },
            Err(e) => {
                warn!("Failed to read pose file {}: {}", path.display(), e);
                BTreeMap::new()
            },
        };

        Self { path, poses }
    }

    /// 存储文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }
}

impl PoseStore for JsonFilePoseStore {
    fn load(&self, name: &str) -> Result<Pose, PoseStoreError> {
        validate_name(name)?;
        self.poses
            .get(name)
            .cloned()
            .ok_or_else(|| PoseStoreError::NotFound(name.to_string()))
    }

    fn save(&mut self, pose: &Pose) -> Result<(), PoseStoreError> {
        validate_name(pose.name())?;

        // 写盘成功后才更新内存副本
        let mut poses = self.poses.clone();
        poses.insert(pose.name().to_string(), pose.clone());

        let content = render_document(&poses)?;
        write_atomic(&self.path, content.as_bytes())?;

        debug!("Saved pose '{}' to {}", pose.name(), self.path.display());
        self.poses = poses;
        Ok(())
    }

    fn list(&self) -> Vec<String> {
        self.poses.keys().cloned().collect()
    }
}

/// 解析通道键：`"3"` 或旧版 `"Servo 4"`
fn parse_channel_key(key: &str) -> Option<ChannelId> {
    let key = key.trim();
    match key.strip_prefix(LEGACY_KEY_PREFIX) {
        Some(number) => {
            let number: ChannelId = number.trim().parse().ok()?;
            number.checked_sub(1)
        },
        None => key.parse().ok(),
    }
}

fn parse_pose(name: &str, entries: &BTreeMap<String, f64>) -> Result<Pose, PoseStoreError> {
    let mut angles = Vec::with_capacity(entries.len());
    for (key, degrees) in entries {
        let id = parse_channel_key(key)
            .ok_or_else(|| PoseStoreError::Format(format!("invalid channel key {:?}", key)))?;
        let angle = Angle::from_degrees(*degrees)
            .ok_or_else(|| PoseStoreError::Format(format!("invalid angle {}", degrees)))?;
        angles.push((id, angle));
    }
    Ok(Pose::new(name, angles))
}

/// 解析整个文档；单个姿态有问题时跳过该姿态
fn parse_document(content: &str) -> Result<BTreeMap<String, Pose>, PoseStoreError> {
    let document: Document =
        serde_json::from_str(content).map_err(|e| PoseStoreError::Format(e.to_string()))?;

    let mut poses = BTreeMap::new();
    for (name, entries) in &document {
        if name.trim().is_empty() {
            warn!("Skipping pose with empty name");
            continue;
        }
        match parse_pose(name, entries) {
            Ok(pose) => {
                poses.insert(name.clone(), pose);
            },
            Err(e) => warn!("Skipping pose '{}': {}", name, e),
        }
    }
    Ok(poses)
}

fn render_document(poses: &BTreeMap<String, Pose>) -> Result<String, PoseStoreError> {
    let document: Document = poses
        .iter()
        .map(|(name, pose)| {
            let entries = pose
                .iter()
                .map(|(id, angle)| (id.to_string(), angle.degrees()))
                .collect();
            (name.clone(), entries)
        })
        .collect();

    serde_json::to_string_pretty(&document).map_err(|e| PoseStoreError::Format(e.to_string()))
}

/// 原子写入：同目录临时文件 + rename
fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let file_name = path.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("not a file path: {}", path.display()),
        )
    })?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut tmp_name = file_name.to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    let result = (|| {
        let mut file = File::create(&tmp_path)?;
        file.write_all(contents)?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn deg(d: i16) -> Angle {
        Angle::from_whole_degrees(d)
    }

    fn stand() -> Pose {
        Pose::new("stand", [(0, deg(90)), (1, Angle::from_tenths(455))])
    }

    #[test]
    fn test_memory_store_round_trip() {
        let mut store = MemoryPoseStore::new();
        store.save(&stand()).unwrap();
        assert_eq!(store.load("stand").unwrap(), stand());
        assert!(matches!(
            store.load("sit"),
            Err(PoseStoreError::NotFound(name)) if name == "sit"
        ));
    }

    #[test]
    fn test_list_is_lexical() {
        let mut store = MemoryPoseStore::new();
        for name in ["walk", "Crouch", "sit", "stand"] {
            store.save(&Pose::new(name, [(0, deg(0))])).unwrap();
        }
        assert_eq!(store.list(), vec!["Crouch", "sit", "stand", "walk"]);
    }

    #[test]
    fn test_empty_name_is_rejected() {
        let mut store = MemoryPoseStore::new();
        let result = store.save(&Pose::new("  ", [(0, deg(0))]));
        assert!(matches!(result, Err(PoseStoreError::InvalidName(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn test_save_overwrites() {
        let mut store = MemoryPoseStore::new();
        store.save(&stand()).unwrap();
        store.save(&Pose::new("stand", [(3, deg(10))])).unwrap();
        assert_eq!(store.load("stand").unwrap().get(3), Some(deg(10)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_parse_channel_key() {
        assert_eq!(parse_channel_key("0"), Some(0));
        assert_eq!(parse_channel_key(" 7 "), Some(7));
        assert_eq!(parse_channel_key("Servo 1"), Some(0));
        assert_eq!(parse_channel_key("Servo 8"), Some(7));
        assert_eq!(parse_channel_key("Servo 0"), None);
        assert_eq!(parse_channel_key("Servo 300"), Some(299));
        assert_eq!(parse_channel_key("256"), Some(256));
        assert_eq!(parse_channel_key("-1"), None);
        assert_eq!(parse_channel_key("hip"), None);
    }

    #[test]
    fn test_json_store_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("poses.json");

        let mut store = JsonFilePoseStore::open(&path);
        assert!(store.is_empty());
        store.save(&stand()).unwrap();

        let reopened = JsonFilePoseStore::open(&path);
        assert_eq!(reopened.load("stand").unwrap(), stand());
        assert!(!dir.path().join("poses.json.tmp").exists());
    }

    #[test]
    fn test_json_store_reads_legacy_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("robot_states.json");
        fs::write(
            &path,
            r#"{"sit": {"Servo 1": 120, "Servo 2": 60.5}, "stand": {"0": 90}}"#,
        )
        .unwrap();

        let store = JsonFilePoseStore::open(&path);
        assert_eq!(store.list(), vec!["sit", "stand"]);

        let sit = store.load("sit").unwrap();
        assert_eq!(sit.get(0), Some(deg(120)));
        assert_eq!(sit.get(1), Some(Angle::from_tenths(605)));
    }

    #[test]
    fn test_json_store_skips_bad_pose_only() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("poses.json");
        fs::write(&path, r#"{"bad": {"left leg": 10}, "good": {"2": 30}}"#).unwrap();

        let store = JsonFilePoseStore::open(&path);
        assert_eq!(store.list(), vec!["good"]);
    }

    #[test]
    fn test_corrupt_file_opens_empty_and_is_replaced() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("poses.json");
        fs::write(&path, "{ not json").unwrap();

        let mut store = JsonFilePoseStore::open(&path);
        assert!(store.is_empty());

        store.save(&stand()).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        let document: Document = serde_json::from_str(&content).unwrap();
        assert_eq!(document["stand"]["1"], 45.5);
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("poses.json");

        let mut store = JsonFilePoseStore::open(&path);
        store.save(&stand()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_failed_save_keeps_memory_unchanged() {
        let dir = TempDir::new().unwrap();
        // 路径指向一个目录，rename 必然失败
        let path = dir.path().join("taken");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("occupant"), "x").unwrap();

        let mut store = JsonFilePoseStore::open(&path);
        let result = store.save(&stand());
        assert!(matches!(result, Err(PoseStoreError::Io(_))));
        assert!(store.is_empty());
    }
}
