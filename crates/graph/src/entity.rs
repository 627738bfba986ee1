//! 엔티티 정체성 해석
//!
//! 엔티티 조각은 그래프에 병합되기 전에 `(entity_type, identity_key)` 쌍으로
//! 해석됩니다. 명시적 `id`가 있으면 그대로 사용하고, 없으면 속성의 정규
//! 직렬화에 대한 SHA-256 해시를 정체성 키로 씁니다. 속성 맵이 `BTreeMap`
//! 이므로 해시는 프로세스/실행 간에 결정적입니다.

use graphwatch_core::error::StorageError;
use graphwatch_core::types::{EntityFragment, PropertyMap, property_map_to_json};
use sha2::{Digest, Sha256};

/// 정체성이 해석된 엔티티
///
/// 그래프 병합 직전의 형태입니다. `properties`에는 `id`/`type` 필드가
/// 포함되지 않습니다.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEntity {
    /// 그래프 레이블로 쓰일 엔티티 타입
    pub entity_type: String,
    /// 병합 키 (`MERGE (n:{type} {id: $id})`)
    pub identity_key: String,
    /// 저장될 속성 집합
    pub properties: PropertyMap,
}

/// 엔티티 조각을 해석합니다.
///
/// 타입이 없는 조각은 `default_type`을 받습니다 (src/dst는 `"Unknown"`,
/// principal은 `"User"`). 타입은 레이블 위치에 삽입되므로
/// `[A-Za-z_][A-Za-z0-9_]*` 형태만 허용됩니다.
///
/// # Errors
///
/// 엔티티 타입이 유효한 레이블이 아니면 [`StorageError::InvalidLabel`]을
/// 반환합니다.
pub fn resolve(
    fragment: &EntityFragment,
    default_type: &str,
) -> Result<ResolvedEntity, StorageError> {
    let entity_type = fragment
        .entity_type
        .clone()
        .unwrap_or_else(|| default_type.to_owned());
    validate_label(&entity_type)?;

    let identity_key = match &fragment.id {
        Some(id) => id.clone(),
        None => identity_hash(&fragment.properties),
    };

    Ok(ResolvedEntity {
        entity_type,
        identity_key,
        properties: fragment.properties.clone(),
    })
}

/// 속성 집합의 결정적 내용 해시를 계산합니다.
///
/// 동일한 속성을 가진 조각은 실행과 무관하게 같은 키로 수렴합니다.
pub fn identity_hash(properties: &PropertyMap) -> String {
    let canonical = serde_json::Value::Object(property_map_to_json(properties)).to_string();
    let digest = Sha256::digest(canonical.as_bytes());
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        hex.push_str(&format!("{byte:02x}"));
    }
    hex
}

/// 엔티티 타입이 유효한 그래프 레이블인지 검증합니다.
pub fn validate_label(label: &str) -> Result<(), StorageError> {
    let mut chars = label.chars();
    let valid_head = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let valid_tail = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid_head && valid_tail {
        Ok(())
    } else {
        Err(StorageError::InvalidLabel {
            label: label.to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphwatch_core::types::PropertyValue;

    fn fragment(json: serde_json::Value) -> EntityFragment {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn explicit_id_is_used_verbatim() {
        let resolved = resolve(
            &fragment(serde_json::json!({"type": "IP", "id": "ip-001", "ip": "10.0.0.1"})),
            "Unknown",
        )
        .unwrap();
        assert_eq!(resolved.entity_type, "IP");
        assert_eq!(resolved.identity_key, "ip-001");
        assert!(resolved.properties.contains_key("ip"));
        assert!(!resolved.properties.contains_key("id"));
    }

    #[test]
    fn missing_id_falls_back_to_content_hash() {
        let resolved = resolve(
            &fragment(serde_json::json!({"type": "IP", "ip": "10.0.0.1"})),
            "Unknown",
        )
        .unwrap();
        assert_eq!(resolved.identity_key.len(), 64);
        assert!(resolved.identity_key.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn identical_fragments_hash_identically() {
        let a = resolve(
            &fragment(serde_json::json!({"type": "IP", "ip": "10.0.0.1", "port": 443.0})),
            "Unknown",
        )
        .unwrap();
        let b = resolve(
            &fragment(serde_json::json!({"port": 443.0, "ip": "10.0.0.1", "type": "IP"})),
            "Unknown",
        )
        .unwrap();
        assert_eq!(a.identity_key, b.identity_key);
    }

    #[test]
    fn property_difference_diverges_hash() {
        let a = identity_hash(&fragment(serde_json::json!({"ip": "10.0.0.1"})).properties);
        let b = identity_hash(&fragment(serde_json::json!({"ip": "10.0.0.2"})).properties);
        assert_ne!(a, b);
    }

    #[test]
    fn missing_type_uses_default() {
        let resolved = resolve(&fragment(serde_json::json!({"ip": "10.0.0.1"})), "Unknown").unwrap();
        assert_eq!(resolved.entity_type, "Unknown");

        let resolved = resolve(&fragment(serde_json::json!({"name": "admin"})), "User").unwrap();
        assert_eq!(resolved.entity_type, "User");
    }

    #[test]
    fn valid_labels_pass() {
        for label in ["IP", "User", "Host", "_internal", "Ipv4Address", "a1_b2"] {
            validate_label(label).unwrap();
        }
    }

    #[test]
    fn injection_shaped_labels_are_rejected() {
        for label in [
            "",
            "1IP",
            "IP Address",
            "IP) DETACH DELETE (n",
            "IP`",
            "유저",
            "IP-Address",
        ] {
            let err = resolve(
                &EntityFragment {
                    entity_type: Some(label.to_owned()),
                    id: Some("x".to_owned()),
                    properties: PropertyMap::new(),
                },
                "Unknown",
            )
            .unwrap_err();
            assert!(
                matches!(err, StorageError::InvalidLabel { .. }),
                "label: {label:?}"
            );
        }
    }

    #[test]
    fn nested_properties_participate_in_hash() {
        let mut inner = PropertyMap::new();
        inner.insert("cc".to_owned(), PropertyValue::Str("KR".to_owned()));
        let mut a = PropertyMap::new();
        a.insert("geo".to_owned(), PropertyValue::Map(inner.clone()));

        let mut inner_b = PropertyMap::new();
        inner_b.insert("cc".to_owned(), PropertyValue::Str("US".to_owned()));
        let mut b = PropertyMap::new();
        b.insert("geo".to_owned(), PropertyValue::Map(inner_b));

        assert_ne!(identity_hash(&a), identity_hash(&b));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn hash_is_stable_under_reserialization(
                entries in prop::collection::btree_map(
                    "[a-z_]{1,12}",
                    "[a-zA-Z0-9 .:]{0,24}",
                    0..8,
                )
            ) {
                let properties: PropertyMap = entries
                    .into_iter()
                    .map(|(k, v)| (k, PropertyValue::Str(v)))
                    .collect();
                prop_assert_eq!(identity_hash(&properties), identity_hash(&properties.clone()));
            }
        }
    }
}
