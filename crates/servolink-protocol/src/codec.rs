//! JSON 编解码
//!
//! 纯变换，无副作用。
//!
//! # 命令格式（主机 -> 控制器）
//!
//! | 命令       | 格式                                        |
//! |------------|---------------------------------------------|
//! | SetAngle   | `{"servo": 0, "angle": 90}`                 |
//! | ApplyPose  | `{"pose": {"0": 45, "1": 90}, "name": "x"}` |
//! | Query      | `{"query": 0}`                              |
//! | 位置数组   | `[90, 90, 45]`（第 i 个元素对应通道 i）     |
//!
//! # 应答格式（控制器 -> 主机）
//!
//! ```text
//! {"servo":0,"current":90.0,"target":180.0,"settled":false}
//! {"error":"malformed","detail":"..."}
//! {"error":"unknown_channel","servo":9,"detail":"..."}
//! ```

use crate::ProtocolError;
use crate::angle::Angle;
use crate::command::{ChannelStatus, Command, ErrorKind, Response};
use crate::pose::{ChannelId, Pose};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

/// 位置数组格式解码后的姿态名
pub const POSITIONAL_POSE_NAME: &str = "positional";

/// 位置数组最多包含的元素个数
pub const MAX_POSITIONAL_ENTRIES: usize = 256;

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct SetAngleWire {
    servo: ChannelId,
    angle: Angle,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PoseWire {
    pose: BTreeMap<ChannelId, Angle>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct QueryWire {
    query: ChannelId,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct StatusWire {
    servo: ChannelId,
    current: Angle,
    target: Angle,
    settled: bool,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ErrorWire {
    error: ErrorKind,
    #[serde(default)]
    servo: Option<ChannelId>,
    #[serde(default)]
    detail: String,
}

fn malformed(err: impl std::fmt::Display) -> ProtocolError {
    ProtocolError::MalformedMessage(err.to_string())
}

fn parse_value(line: &str) -> Result<Value, ProtocolError> {
    serde_json::from_str(line.trim()).map_err(malformed)
}

/// 解码一行命令
///
/// 只做语法检查：通道是否存在、角度是否越界由注册表处理。
///
/// # 错误
///
/// 不是已知格式时返回 [`ProtocolError::MalformedMessage`]。
///
/// # 示例
///
/// ```rust
/// use servolink_protocol::{Angle, Command, decode_command};
///
/// let cmd = decode_command(r#"{"servo":0,"angle":200}"#).unwrap();
/// assert_eq!(
///     cmd,
///     Command::SetAngle { channel: 0, angle: Angle::from_whole_degrees(200) }
/// );
/// ```
pub fn decode_command(line: &str) -> Result<Command, ProtocolError> {
    match parse_value(line)? {
        Value::Array(items) => decode_positional(items),
        Value::Object(map) => {
            if map.contains_key("pose") {
                let wire: PoseWire = serde_json::from_value(Value::Object(map)).map_err(malformed)?;
                Ok(Command::ApplyPose {
                    pose: Pose::new(wire.name.unwrap_or_default(), wire.pose),
                })
            } else if map.contains_key("query") {
                let wire: QueryWire = serde_json::from_value(Value::Object(map)).map_err(malformed)?;
                Ok(Command::Query {
                    channel: wire.query,
                })
            } else if map.contains_key("servo") {
                let wire: SetAngleWire =
                    serde_json::from_value(Value::Object(map)).map_err(malformed)?;
                Ok(Command::SetAngle {
                    channel: wire.servo,
                    angle: wire.angle,
                })
            } else {
                Err(malformed("expected one of `servo`, `pose` or `query`"))
            }
        },
        other => Err(malformed(format!("expected object or array, got {}", other))),
    }
}

/// 位置数组：第 i 个元素是通道 i 的角度
fn decode_positional(items: Vec<Value>) -> Result<Command, ProtocolError> {
    if items.len() > MAX_POSITIONAL_ENTRIES {
        return Err(malformed(format!(
            "positional pose has {} entries, at most {} are accepted",
            items.len(),
            MAX_POSITIONAL_ENTRIES
        )));
    }

    let mut angles: BTreeMap<ChannelId, Angle> = BTreeMap::new();
    for (id, item) in (0..).zip(items) {
        let angle: Angle = serde_json::from_value(item)
            .map_err(|e| malformed(format!("positional entry {}: {}", id, e)))?;
        angles.insert(id, angle);
    }

    Ok(Command::ApplyPose {
        pose: Pose::new(POSITIONAL_POSE_NAME, angles),
    })
}

fn angle_value(angle: Angle) -> Value {
    json!(angle.degrees())
}

fn command_value(command: &Command) -> Value {
    match command {
        Command::SetAngle { channel, angle } => json!({
            "servo": channel,
            "angle": angle_value(*angle),
        }),
        Command::ApplyPose { pose } => {
            let angles: Map<String, Value> = pose
                .iter()
                .map(|(id, angle)| (id.to_string(), angle_value(angle)))
                .collect();
            let mut object = Map::new();
            object.insert("pose".to_string(), Value::Object(angles));
            if !pose.name().is_empty() {
                object.insert("name".to_string(), Value::String(pose.name().to_string()));
            }
            Value::Object(object)
        },
        Command::Query { channel } => json!({ "query": channel }),
    }
}

/// 编码命令（不含换行符）
pub fn encode_command(command: &Command) -> String {
    command_value(command).to_string()
}

/// 编码命令为一行（含 `\n`）
pub fn encode_command_line(command: &Command) -> Vec<u8> {
    let mut line = encode_command(command).into_bytes();
    line.push(b'\n');
    line
}

fn response_value(response: &Response) -> Value {
    match response {
        Response::Status(status) => json!({
            "servo": status.channel,
            "current": angle_value(status.current),
            "target": angle_value(status.target),
            "settled": status.settled,
        }),
        Response::Error {
            kind,
            channel,
            detail,
        } => {
            let mut object = Map::new();
            object.insert("error".to_string(), Value::from(kind.as_str()));
            if let Some(channel) = channel {
                object.insert("servo".to_string(), Value::from(*channel));
            }
            object.insert("detail".to_string(), Value::from(detail.as_str()));
            Value::Object(object)
        },
    }
}

/// 编码应答（不含换行符）
pub fn encode_response(response: &Response) -> String {
    response_value(response).to_string()
}

/// 编码应答为一行（含 `\n`）
pub fn encode_response_line(response: &Response) -> Vec<u8> {
    let mut line = encode_response(response).into_bytes();
    line.push(b'\n');
    line
}

/// 解码一行应答
pub fn decode_response(line: &str) -> Result<Response, ProtocolError> {
    let Value::Object(map) = parse_value(line)? else {
        return Err(malformed("response must be an object"));
    };

    if map.contains_key("error") {
        let wire: ErrorWire = serde_json::from_value(Value::Object(map)).map_err(malformed)?;
        Ok(Response::Error {
            kind: wire.error,
            channel: wire.servo,
            detail: wire.detail,
        })
    } else {
        let wire: StatusWire = serde_json::from_value(Value::Object(map)).map_err(malformed)?;
        Ok(Response::Status(ChannelStatus {
            channel: wire.servo,
            current: wire.current,
            target: wire.target,
            settled: wire.settled,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deg(d: i16) -> Angle {
        Angle::from_whole_degrees(d)
    }

    #[test]
    fn test_decode_set_angle() {
        let cmd = decode_command(r#"{"servo": 3, "angle": 45.5}"#).unwrap();
        assert_eq!(
            cmd,
            Command::SetAngle {
                channel: 3,
                angle: Angle::from_tenths(455)
            }
        );
    }

    #[test]
    fn test_decode_set_angle_out_of_range_is_not_a_codec_error() {
        // 限幅是注册表的职责
        let cmd = decode_command(r#"{"servo":0,"angle":999}"#).unwrap();
        assert_eq!(
            cmd,
            Command::SetAngle {
                channel: 0,
                angle: deg(999)
            }
        );
    }

    #[test]
    fn test_decode_pose() {
        let cmd = decode_command(r#"{"pose": {"1": 45, "2": 999}, "name": "crouch"}"#).unwrap();
        let Command::ApplyPose { pose } = cmd else {
            panic!("Expected ApplyPose variant");
        };
        assert_eq!(pose.name(), "crouch");
        assert_eq!(pose.get(1), Some(deg(45)));
        assert_eq!(pose.get(2), Some(deg(999)));
    }

    #[test]
    fn test_decode_pose_without_name() {
        let cmd = decode_command(r#"{"pose":{}}"#).unwrap();
        assert_eq!(
            cmd,
            Command::ApplyPose {
                pose: Pose::new("", [])
            }
        );
    }

    #[test]
    fn test_decode_positional_array() {
        let cmd = decode_command("[90, 45.5, 0]").unwrap();
        let Command::ApplyPose { pose } = cmd else {
            panic!("Expected ApplyPose variant");
        };
        assert_eq!(pose.name(), POSITIONAL_POSE_NAME);
        assert_eq!(pose.get(0), Some(deg(90)));
        assert_eq!(pose.get(1), Some(Angle::from_tenths(455)));
        assert_eq!(pose.get(2), Some(deg(0)));
    }

    #[test]
    fn test_decode_query() {
        assert_eq!(
            decode_command(r#"{"query":7}"#).unwrap(),
            Command::Query { channel: 7 }
        );
    }

    #[test]
    fn test_decode_malformed() {
        let cases = [
            "not json",
            "{\"servo\":0}",
            "{\"servo\":0,\"angle\":\"ninety\"}",
            "{\"servo\":-1,\"angle\":10}",
            "{\"servo\":0,\"angle\":10,\"speed\":3}",
            "{\"pose\":{\"id1\":45}}",
            "{\"hello\":1}",
            "42",
            "[1, \"x\"]",
        ];
        for case in cases {
            match decode_command(case) {
                Err(ProtocolError::MalformedMessage(_)) => {},
                other => panic!("{:?} should be malformed, got {:?}", case, other),
            }
        }
    }

    #[test]
    fn test_encode_set_angle() {
        let cmd = Command::SetAngle {
            channel: 0,
            angle: Angle::from_tenths(905),
        };
        assert_eq!(encode_command(&cmd), r#"{"angle":90.5,"servo":0}"#);
        assert_eq!(decode_command(&encode_command(&cmd)).unwrap(), cmd);
    }

    #[test]
    fn test_encode_pose_line() {
        let cmd = Command::ApplyPose {
            pose: Pose::new("stand", [(0, deg(90)), (1, deg(45))]),
        };
        let line = encode_command_line(&cmd);
        assert_eq!(line.last(), Some(&b'\n'));
        let text = std::str::from_utf8(&line).unwrap();
        assert_eq!(decode_command(text).unwrap(), cmd);
    }

    #[test]
    fn test_response_status() {
        let response = Response::Status(ChannelStatus {
            channel: 2,
            current: deg(100),
            target: deg(180),
            settled: false,
        });
        let text = encode_response(&response);
        assert!(text.contains("\"current\":100.0"), "{}", text);
        assert_eq!(decode_response(&text).unwrap(), response);
    }

    #[test]
    fn test_response_error() {
        let response = Response::Error {
            kind: ErrorKind::UnknownChannel,
            channel: Some(9),
            detail: "Unknown channel: 9".to_string(),
        };
        let text = encode_response(&response);
        assert_eq!(
            text,
            r#"{"detail":"Unknown channel: 9","error":"unknown_channel","servo":9}"#
        );
        assert_eq!(decode_response(&text).unwrap(), response);
    }

    #[test]
    fn test_response_error_without_channel() {
        let response = Response::Error {
            kind: ErrorKind::Malformed,
            channel: None,
            detail: "expected value".to_string(),
        };
        let text = encode_response(&response);
        assert!(!text.contains("servo"), "{}", text);
        assert_eq!(decode_response(&text).unwrap(), response);

        // 旧版控制器的错误应答不带 servo
        assert_eq!(
            decode_response(r#"{"error":"framing"}"#).unwrap(),
            Response::Error {
                kind: ErrorKind::Framing,
                channel: None,
                detail: String::new(),
            }
        );
    }

    #[test]
    fn test_decode_large_channel_ids() {
        // 通道是否存在由注册表判断，编解码不设上限
        assert_eq!(
            decode_command(r#"{"servo":300,"angle":10}"#).unwrap(),
            Command::SetAngle {
                channel: 300,
                angle: deg(10)
            }
        );
        assert_eq!(
            decode_command(r#"{"query":70000}"#).unwrap(),
            Command::Query { channel: 70000 }
        );
    }

    #[test]
    fn test_decode_positional_too_long() {
        let line = format!("[{}]", vec!["90"; MAX_POSITIONAL_ENTRIES + 1].join(","));
        assert!(matches!(
            decode_command(&line),
            Err(ProtocolError::MalformedMessage(_))
        ));
        let line = format!("[{}]", vec!["90"; MAX_POSITIONAL_ENTRIES].join(","));
        assert!(decode_command(&line).is_ok());
    }

    #[test]
    fn test_decode_response_rejects_command() {
        assert!(decode_response(r#"{"servo":0,"angle":90}"#).is_err());
    }
}
