// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `startup.rs`

#[cfg(test)]
mod tests {
    use crate::kea::fake::FakeKea;
    use crate::kea::service::DhcpService;
    use crate::kea::types::CMD_VERSION_GET;
    use crate::startup::check_kea_connectivity;
    use std::sync::Arc;
    use std::time::Duration;

    fn service() -> (Arc<FakeKea>, DhcpService) {
        let kea = Arc::new(FakeKea::new());
        let svc = DhcpService::new(kea.clone(), None);
        (kea, svc)
    }

    async fn probe(svc: &DhcpService) -> anyhow::Result<()> {
        check_kea_connectivity(svc, 3, Duration::from_secs(5), Duration::ZERO).await
    }

    #[tokio::test]
    async fn test_reachable_on_first_attempt() {
        let (kea, svc) = service();

        probe(&svc).await.unwrap();
        assert_eq!(kea.calls(CMD_VERSION_GET), 1);
    }

    #[tokio::test]
    async fn test_unsupported_answer_counts_as_reachable() {
        let (kea, svc) = service();
        kea.override_command(CMD_VERSION_GET, 2, "'version-get' command not supported.");

        probe(&svc).await.unwrap();
        assert_eq!(kea.calls(CMD_VERSION_GET), 1);
    }

    #[tokio::test]
    async fn test_error_result_is_retried_then_fatal() {
        let (kea, svc) = service();
        kea.override_command(CMD_VERSION_GET, 1, "server is shutting down");

        let err = probe(&svc).await.unwrap_err();
        assert!(err.to_string().contains("after 3 attempts"));
        assert!(err.to_string().contains("server is shutting down"));
        assert_eq!(kea.calls(CMD_VERSION_GET), 3);
    }

    #[tokio::test]
    async fn test_unreachable_exhausts_attempts() {
        let (kea, svc) = service();
        kea.set_unreachable(true);

        assert!(probe(&svc).await.is_err());
        assert_eq!(kea.calls(CMD_VERSION_GET), 3);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_probes_once() {
        let (kea, svc) = service();

        check_kea_connectivity(&svc, 0, Duration::from_secs(1), Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(kea.calls(CMD_VERSION_GET), 1);
    }
}
