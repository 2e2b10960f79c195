// SPDX-FileCopyrightText: 2026 Forumbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Space classification into GROUP and DIRECT.

use forumbridge_core::{Space, SpaceKind, SyncError};

/// Classifies a space from its origin-reported type.
///
/// `SPACE`, `ROOM` and `GROUP_CHAT` are group spaces; `DIRECT_MESSAGE` and `DM`
/// are direct spaces. Matching ignores case and surrounding whitespace. Any
/// other value is an error rather than a guess.
pub fn classify(space: &Space) -> Result<SpaceKind, SyncError> {
    let reported = space.space_type.trim().to_ascii_uppercase();
    match reported.as_str() {
        "SPACE" | "ROOM" | "GROUP_CHAT" => Ok(SpaceKind::Group),
        "DIRECT_MESSAGE" | "DM" => Ok(SpaceKind::Direct),
        _ => Err(SyncError::Classification {
            space_id: space.id.clone(),
            space_type: space.space_type.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn space(space_type: &str) -> Space {
        Space {
            id: "spaces/AAA".into(),
            display_name: "Test".into(),
            space_type: space_type.into(),
        }
    }

    #[test]
    fn group_types() {
        for t in ["SPACE", "ROOM", "GROUP_CHAT", " room ", "Space"] {
            assert_eq!(classify(&space(t)).unwrap(), SpaceKind::Group, "{t}");
        }
    }

    #[test]
    fn direct_types() {
        for t in ["DIRECT_MESSAGE", "DM", "dm", "\tdirect_message\n"] {
            assert_eq!(classify(&space(t)).unwrap(), SpaceKind::Direct, "{t}");
        }
    }

    #[test]
    fn unknown_and_empty_types_fail() {
        for t in ["", "   ", "CHANNEL", "SPACE_TYPE_UNSPECIFIED"] {
            let err = classify(&space(t)).unwrap_err();
            match err {
                SyncError::Classification { space_id, space_type } => {
                    assert_eq!(space_id, "spaces/AAA");
                    assert_eq!(space_type, t);
                }
                other => panic!("expected Classification, got {other:?}"),
            }
        }
    }
}
