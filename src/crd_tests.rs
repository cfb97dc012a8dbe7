// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `crd.rs`

#[cfg(test)]
mod tests {
    use crate::crd::*;
    use kube::{CustomResourceExt, Resource};
    use serde_json::json;

    #[test]
    fn test_network_configuration_crd_metadata() {
        let crd = NetworkConfiguration::crd();
        assert_eq!(
            crd.metadata.name.as_deref(),
            Some("networkconfigurations.vitistack.io")
        );
        assert_eq!(crd.spec.scope, "Namespaced");
        assert_eq!(NetworkConfiguration::group(&()), "vitistack.io");
        assert_eq!(NetworkConfiguration::version(&()), "v1alpha1");

        let nn = NetworkNamespace::crd();
        assert_eq!(
            nn.metadata.name.as_deref(),
            Some("networknamespaces.vitistack.io")
        );
    }

    #[test]
    fn test_spec_deserializes_camel_case() {
        let spec: NetworkConfigurationSpec = serde_json::from_value(json!({
            "networkInterfaces": [
                {"name": "eth0", "macAddress": "AA-BB-CC-DD-EE-FF", "vlan": "100"},
                {"name": "eth1"}
            ]
        }))
        .unwrap();

        assert_eq!(spec.network_interfaces.len(), 2);
        assert_eq!(spec.network_interfaces[0].mac_address, "AA-BB-CC-DD-EE-FF");
        assert_eq!(spec.network_interfaces[0].vlan.as_deref(), Some("100"));
        assert_eq!(spec.network_interfaces[1].mac_address, "");
    }

    #[test]
    fn test_status_serializes_camel_case() {
        let status = NetworkConfigurationStatus {
            phase: Some("Ready".to_string()),
            network_interfaces: vec![NetworkInterfaceStatus {
                name: "eth0".to_string(),
                mac_address: "aa:bb:cc:dd:ee:ff".to_string(),
                ipv4_addresses: vec!["10.0.1.5".to_string()],
                ipv4_subnet: Some("10.0.1.0/24".to_string()),
                dhcp_reserved: true,
                ..Default::default()
            }],
            conditions: vec![Condition {
                r#type: "Ready".to_string(),
                status: "True".to_string(),
                observed_generation: Some(4),
                ..Default::default()
            }],
            ..Default::default()
        };

        let value = serde_json::to_value(&status).unwrap();
        let iface = &value["networkInterfaces"][0];
        assert_eq!(iface["macAddress"], "aa:bb:cc:dd:ee:ff");
        assert_eq!(iface["ipv4Addresses"][0], "10.0.1.5");
        assert_eq!(iface["ipv4Subnet"], "10.0.1.0/24");
        assert_eq!(iface["dhcpReserved"], true);
        assert!(iface.get("ipv4Gateway").is_none());
        assert_eq!(value["conditions"][0]["observedGeneration"], 4);
        assert!(value.get("created").is_none());
    }

    #[test]
    fn test_namespace_prefix_accepts_both_spellings() {
        let camel: NetworkNamespaceStatus =
            serde_json::from_value(json!({"ipv4Prefix": "10.0.1.0/24"})).unwrap();
        let snake: NetworkNamespaceStatus =
            serde_json::from_value(json!({"ipv4_prefix": "10.0.1.0/24"})).unwrap();

        assert_eq!(camel.ipv4_prefix.as_deref(), Some("10.0.1.0/24"));
        assert_eq!(camel, snake);
    }
}
