#[cfg(test)]
mod tests {
    use crate::types::*;
    use crate::DomainError;

    fn full_entries() -> Vec<(&'static str, String)> {
        vec![
            (MANAGEMENT_ENDPOINT_URL, "aud0".into()),
            (RESOURCE_MANAGER_ENDPOINT_URL, "https://arm.example".into()),
            (GALLERY_ENDPOINT_URL, "https://gallery.example/".into()),
            (ACTIVE_DIRECTORY_ENDPOINT_URL, "https://login.example/".into()),
            (ACTIVE_DIRECTORY_RESOURCE_ID, "aud0".into()),
            (ACTIVE_DIRECTORY_GRAPH_RESOURCE_ID, "https://graph.example/".into()),
            (STORAGE_ENDPOINT_SUFFIX, ".core.example.net".into()),
            (KEY_VAULT_DNS_SUFFIX, ".vault.example.net".into()),
        ]
    }

    #[test]
    fn descriptor_from_all_entries() {
        let d = EnvironmentDescriptor::from_entries(full_entries()).unwrap();
        assert_eq!(d.resource_manager_endpoint_url, "https://arm.example");
        assert_eq!(d.key_vault_dns_suffix, ".vault.example.net");
    }

    #[test]
    fn descriptor_missing_entry_fails() {
        let entries: Vec<_> = full_entries()
            .into_iter()
            .filter(|(k, _)| *k != ACTIVE_DIRECTORY_GRAPH_RESOURCE_ID)
            .collect();
        let err = EnvironmentDescriptor::from_entries(entries).unwrap_err();
        assert!(matches!(err, DomainError::MissingEndpoint(ACTIVE_DIRECTORY_GRAPH_RESOURCE_ID)));
    }

    #[test]
    fn descriptor_empty_value_counts_as_missing() {
        let mut entries = full_entries();
        entries[2].1 = "  ".into();
        let err = EnvironmentDescriptor::from_entries(entries).unwrap_err();
        assert!(matches!(err, DomainError::MissingEndpoint(GALLERY_ENDPOINT_URL)));
    }

    #[test]
    fn descriptor_rejects_unknown_key() {
        let mut entries = full_entries();
        entries.push(("sqlServerHostnameSuffix", ".sql".into()));
        let err = EnvironmentDescriptor::from_entries(entries).unwrap_err();
        assert!(matches!(err, DomainError::UnknownEndpointKey(k) if k == "sqlServerHostnameSuffix"));
    }

    #[test]
    fn descriptor_rejects_undotted_suffix() {
        let mut entries = full_entries();
        entries[6].1 = "core.example.net".into();
        let err = EnvironmentDescriptor::from_entries(entries).unwrap_err();
        assert!(matches!(err, DomainError::InvalidSuffix { key: STORAGE_ENDPOINT_SUFFIX, .. }));
    }

    #[test]
    fn entries_roundtrip_through_from_entries() {
        let d = EnvironmentDescriptor::from_entries(full_entries()).unwrap();
        let again = EnvironmentDescriptor::from_entries(
            d.entries().iter().map(|(k, v)| (*k, v.to_string())),
        )
        .unwrap();
        assert_eq!(d, again);
    }

    #[test]
    fn descriptor_serialises_with_camel_case_keys() {
        let d = EnvironmentDescriptor::from_entries(full_entries()).unwrap();
        let v = serde_json::to_value(&d).unwrap();
        for key in EnvironmentDescriptor::KEYS {
            assert!(v.get(key).is_some(), "missing key {key} in {v}");
        }
    }

    #[test]
    fn scopes_are_derived_from_audience_and_vault_suffix() {
        let mut d = EnvironmentDescriptor::from_entries(full_entries()).unwrap();
        d.active_directory_resource_id = "https://management.example/abc/".into();
        assert_eq!(d.management_scope(), "https://management.example/abc/.default");
        assert_eq!(d.key_vault_scope(), "https://vault.example.net/.default");
    }

    #[test]
    fn identity_debug_hides_secret() {
        let id = Identity::new("c1", "s3cr3t", "t1");
        let dbg = format!("{:?}", id);
        assert!(dbg.contains("c1"));
        assert!(!dbg.contains("s3cr3t"), "secret leaked: {dbg}");
    }

    #[test]
    fn storage_key_debug_hides_value() {
        let key = StorageAccountKey {
            key_name: "key1".into(),
            value: "AAAA==".into(),
            permissions: "FULL".into(),
        };
        assert!(!format!("{:?}", key).contains("AAAA=="));
    }

    #[test]
    fn storage_kind_parses_arm_names() {
        assert_eq!("StorageV2".parse::<StorageKind>().unwrap(), StorageKind::StorageV2);
        assert!("storagev3".parse::<StorageKind>().is_err());
        assert_eq!(StorageKind::Storage.to_string(), "Storage");
    }
}
