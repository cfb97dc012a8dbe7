// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `options.rs`

#[cfg(test)]
mod tests {
    use crate::kea::options::gateway_and_dns;
    use crate::kea::types::OptionData;

    fn opt(code: Option<u32>, name: Option<&str>, data: &str) -> OptionData {
        OptionData {
            code,
            name: name.map(str::to_string),
            data: Some(data.to_string()),
        }
    }

    #[test]
    fn test_gateway_and_dns_by_code() {
        let options = vec![
            opt(Some(3), None, "10.0.0.1"),
            opt(Some(6), None, "10.0.0.53, 10.0.0.54"),
        ];

        let (gateway, dns) = gateway_and_dns(&options);
        assert_eq!(gateway.as_deref(), Some("10.0.0.1"));
        assert_eq!(dns, vec!["10.0.0.53", "10.0.0.54"]);
    }

    #[test]
    fn test_gateway_and_dns_by_name() {
        let options = vec![
            opt(None, Some("domain-name-servers"), "1.1.1.1"),
            opt(None, Some("routers"), "192.168.1.1,192.168.1.2"),
        ];

        let (gateway, dns) = gateway_and_dns(&options);
        assert_eq!(gateway.as_deref(), Some("192.168.1.1"));
        assert_eq!(dns, vec!["1.1.1.1"]);
    }

    #[test]
    fn test_unrelated_options_are_ignored() {
        let options = vec![
            opt(Some(15), Some("domain-name"), "example.com"),
            OptionData {
                code: Some(3),
                name: None,
                data: None,
            },
        ];

        let (gateway, dns) = gateway_and_dns(&options);
        assert!(gateway.is_none());
        assert!(dns.is_empty());
    }
}
