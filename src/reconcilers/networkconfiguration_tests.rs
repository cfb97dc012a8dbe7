// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `networkconfiguration.rs`

#[cfg(test)]
mod tests {
    use crate::config::ReservationPolicy;
    use crate::constants::NETWORK_CONFIGURATION_FINALIZER;
    use crate::context::Context;
    use crate::crd::{
        NetworkConfiguration, NetworkConfigurationSpec, NetworkConfigurationStatus,
        NetworkInterface,
    };
    use crate::kea::fake::{FakeKea, FakeReservation};
    use crate::kea::service::DhcpService;
    use crate::kea::types::{CMD_RESERVATION_ADD, CMD_RESERVATION_DEL, CMD_SUBNET4_LIST};
    use crate::reconcilers::networkconfiguration::{
        reconcile_network_configuration, summary_message, ReconcileAction,
    };
    use crate::reconcilers::store::NetworkConfigStore;
    use anyhow::Result;
    use async_trait::async_trait;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};
    use k8s_openapi::jiff::Timestamp;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    const NAMESPACE: &str = "tenant-a";
    const PREFIX: &str = "10.0.1.0/24";
    const MAC_A: &str = "aa:bb:cc:dd:ee:01";
    const MAC_B: &str = "aa:bb:cc:dd:ee:02";

    #[derive(Default)]
    struct StoreState {
        prefixes: HashMap<String, String>,
        finalizer_adds: usize,
        finalizer_removes: usize,
        statuses: Vec<NetworkConfigurationStatus>,
    }

    #[derive(Default)]
    struct FakeStore {
        state: Mutex<StoreState>,
    }

    impl FakeStore {
        fn with_prefix(namespace: &str, prefix: &str) -> Self {
            let store = Self::default();
            store
                .state
                .lock()
                .unwrap()
                .prefixes
                .insert(namespace.to_string(), prefix.to_string());
            store
        }

        fn patches(&self) -> usize {
            self.state.lock().unwrap().statuses.len()
        }

        fn last_status(&self) -> Option<NetworkConfigurationStatus> {
            self.state.lock().unwrap().statuses.last().cloned()
        }

        fn finalizer_adds(&self) -> usize {
            self.state.lock().unwrap().finalizer_adds
        }

        fn finalizer_removes(&self) -> usize {
            self.state.lock().unwrap().finalizer_removes
        }
    }

    #[async_trait]
    impl NetworkConfigStore for FakeStore {
        async fn add_finalizer(&self, _nc: &NetworkConfiguration) -> Result<()> {
            self.state.lock().unwrap().finalizer_adds += 1;
            Ok(())
        }

        async fn remove_finalizer(&self, _nc: &NetworkConfiguration) -> Result<()> {
            self.state.lock().unwrap().finalizer_removes += 1;
            Ok(())
        }

        async fn patch_status(
            &self,
            _nc: &NetworkConfiguration,
            status: &NetworkConfigurationStatus,
        ) -> Result<()> {
            self.state.lock().unwrap().statuses.push(status.clone());
            Ok(())
        }

        async fn namespace_ipv4_prefix(&self, namespace: &str) -> Result<Option<String>> {
            Ok(self.state.lock().unwrap().prefixes.get(namespace).cloned())
        }
    }

    struct Harness {
        kea: Arc<FakeKea>,
        store: Arc<FakeStore>,
        ctx: Context,
    }

    fn harness(store: FakeStore, policy: ReservationPolicy) -> Harness {
        let kea = Arc::new(FakeKea::new());
        let store = Arc::new(store);
        let ctx = Context::new(
            store.clone(),
            Arc::new(DhcpService::new(kea.clone(), None)),
            Duration::from_secs(30),
            policy,
        );
        Harness { kea, store, ctx }
    }

    fn network_configuration(macs: &[&str]) -> NetworkConfiguration {
        NetworkConfiguration {
            metadata: ObjectMeta {
                name: Some("worker-01".to_string()),
                namespace: Some(NAMESPACE.to_string()),
                generation: Some(1),
                finalizers: Some(vec![NETWORK_CONFIGURATION_FINALIZER.to_string()]),
                ..Default::default()
            },
            spec: NetworkConfigurationSpec {
                network_interfaces: macs
                    .iter()
                    .enumerate()
                    .map(|(i, mac)| NetworkInterface {
                        name: format!("eth{i}"),
                        mac_address: (*mac).to_string(),
                        vlan: None,
                    })
                    .collect(),
            },
            status: None,
        }
    }

    /// Run a pass and feed the written status back, as the watch would.
    async fn pass(h: &Harness, nc: &mut NetworkConfiguration) -> ReconcileAction {
        let action = reconcile_network_configuration(&h.ctx, nc).await.unwrap();
        if let Some(status) = h.store.last_status() {
            nc.status = Some(status);
        }
        action
    }

    fn ready_condition(nc: &NetworkConfiguration) -> (String, Option<String>) {
        let condition = &nc.status.as_ref().unwrap().conditions[0];
        (condition.status.clone(), condition.reason.clone())
    }

    #[test]
    fn test_summary_message() {
        assert_eq!(
            summary_message(2, 2),
            "All 2 MAC reservations configured with assigned IPs"
        );
        assert_eq!(
            summary_message(2, 1),
            "2 MAC reservations configured (1 with IP, 1 will get IP on DHCP request)"
        );
        assert_eq!(
            summary_message(3, 0),
            "All 3 MAC reservations configured (IPs will be auto-allocated on DHCP request)"
        );
    }

    #[tokio::test]
    async fn test_missing_finalizer_is_added_first() {
        let h = harness(FakeStore::with_prefix(NAMESPACE, PREFIX), ReservationPolicy::default());
        let mut nc = network_configuration(&[MAC_A]);
        nc.metadata.finalizers = None;

        let action = reconcile_network_configuration(&h.ctx, &nc).await.unwrap();

        assert_eq!(action, ReconcileAction::RequeueNow);
        assert_eq!(h.store.finalizer_adds(), 1);
        assert_eq!(h.store.patches(), 0);
        assert_eq!(h.kea.calls(CMD_SUBNET4_LIST), 0);
    }

    #[tokio::test]
    async fn test_two_macs_one_leased_one_mac_only() {
        let h = harness(FakeStore::with_prefix(NAMESPACE, PREFIX), ReservationPolicy::default());
        h.kea.add_subnet_with_options(7, PREFIX, "10.0.1.1", &["10.0.0.53"]);
        h.kea.add_lease(MAC_A, "10.0.1.50", 7, 1000);
        let mut nc = network_configuration(&[MAC_A, MAC_B]);

        let action = pass(&h, &mut nc).await;

        assert_eq!(action, ReconcileAction::Requeue(Duration::from_secs(30)));
        let mut reservations = h.kea.reservations();
        reservations.sort_by(|a, b| a.mac.cmp(&b.mac));
        assert_eq!(
            reservations,
            vec![
                FakeReservation {
                    subnet_id: 7,
                    mac: MAC_A.to_string(),
                    ip: Some("10.0.1.50".to_string())
                },
                FakeReservation {
                    subnet_id: 7,
                    mac: MAC_B.to_string(),
                    ip: None
                },
            ]
        );

        let status = nc.status.as_ref().unwrap();
        assert!(status
            .message
            .as_deref()
            .unwrap()
            .contains("1 with IP, 1 will get IP on DHCP request"));
        assert_eq!(ready_condition(&nc), ("True".to_string(), Some("Configured".to_string())));
        assert_eq!(status.phase.as_deref(), Some("Ready"));

        let eth0 = &status.network_interfaces[0];
        assert_eq!(eth0.ipv4_addresses, vec!["10.0.1.50"]);
        assert_eq!(eth0.ipv4_subnet.as_deref(), Some(PREFIX));
        assert_eq!(eth0.ipv4_gateway.as_deref(), Some("10.0.1.1"));
        assert_eq!(eth0.dns, vec!["10.0.0.53"]);
        assert!(eth0.dhcp_reserved);
        assert!(status.network_interfaces[1].ipv4_addresses.is_empty());
        assert!(status.network_interfaces[1].dhcp_reserved);
    }

    #[tokio::test]
    async fn test_status_keeps_declared_mac_spelling() {
        let h = harness(FakeStore::with_prefix(NAMESPACE, PREFIX), ReservationPolicy::default());
        h.kea.add_subnet(7, PREFIX);
        let mut nc = network_configuration(&["AA-BB-CC-DD-EE-01", "aabb.ccdd.ee02"]);

        pass(&h, &mut nc).await;

        let mut macs: Vec<String> = h.kea.reservations().into_iter().map(|r| r.mac).collect();
        macs.sort();
        assert_eq!(macs, vec![MAC_A.to_string(), MAC_B.to_string()]);
        let status = nc.status.as_ref().unwrap();
        assert_eq!(status.network_interfaces[0].mac_address, "AA-BB-CC-DD-EE-01");
        assert_eq!(status.network_interfaces[1].mac_address, "aabb.ccdd.ee02");
        assert!(status.network_interfaces.iter().all(|i| i.dhcp_reserved));
    }

    #[tokio::test]
    async fn test_repeat_pass_is_idempotent() {
        let h = harness(FakeStore::with_prefix(NAMESPACE, PREFIX), ReservationPolicy::default());
        h.kea.add_subnet(7, PREFIX);
        h.kea.add_lease(MAC_A, "10.0.1.50", 7, 1000);
        let mut nc = network_configuration(&[MAC_A, MAC_B]);

        pass(&h, &mut nc).await;
        let adds = h.kea.calls(CMD_RESERVATION_ADD);
        let patches = h.store.patches();

        let action = pass(&h, &mut nc).await;

        assert_eq!(action, ReconcileAction::Requeue(Duration::from_secs(30)));
        assert_eq!(h.kea.calls(CMD_RESERVATION_ADD), adds);
        assert_eq!(h.store.patches(), patches);
    }

    #[tokio::test]
    async fn test_lease_outside_prefix_is_reserved_mac_only() {
        let h = harness(FakeStore::with_prefix(NAMESPACE, PREFIX), ReservationPolicy::default());
        h.kea.add_subnet(7, PREFIX);
        h.kea.add_lease(MAC_A, "192.168.9.9", 3, 1000);
        let mut nc = network_configuration(&[MAC_A]);

        pass(&h, &mut nc).await;

        assert_eq!(
            h.kea.reservations(),
            vec![FakeReservation {
                subnet_id: 7,
                mac: MAC_A.to_string(),
                ip: None
            }]
        );
        assert_eq!(
            nc.status.unwrap().message.as_deref(),
            Some("All 1 MAC reservations configured (IPs will be auto-allocated on DHCP request)")
        );
    }

    #[tokio::test]
    async fn test_require_lease_policy_reports_unleased_mac() {
        let h = harness(FakeStore::with_prefix(NAMESPACE, PREFIX), ReservationPolicy::RequireLease);
        h.kea.add_subnet(7, PREFIX);
        h.kea.add_lease(MAC_A, "10.0.1.50", 7, 1000);
        let mut nc = network_configuration(&[MAC_A, MAC_B]);

        let action = pass(&h, &mut nc).await;

        assert_eq!(action, ReconcileAction::Requeue(Duration::from_secs(15)));
        assert_eq!(h.kea.reservations().len(), 1);
        let status = nc.status.as_ref().unwrap();
        assert_eq!(status.phase.as_deref(), Some("Error"));
        assert!(status.message.as_deref().unwrap().contains(MAC_B));
        assert_eq!(ready_condition(&nc).1.as_deref(), Some("ReservationFailed"));
    }

    #[tokio::test]
    async fn test_failed_mac_does_not_stop_later_macs() {
        let h = harness(FakeStore::with_prefix(NAMESPACE, PREFIX), ReservationPolicy::default());
        h.kea.add_subnet(7, PREFIX);
        h.kea.fail_reservation_add(MAC_A, "host database is read-only");
        let mut nc = network_configuration(&[MAC_A, MAC_B]);

        let action = pass(&h, &mut nc).await;

        assert_eq!(action, ReconcileAction::Requeue(Duration::from_secs(15)));
        assert_eq!(
            h.kea.reservations(),
            vec![FakeReservation {
                subnet_id: 7,
                mac: MAC_B.to_string(),
                ip: None
            }]
        );
        let status = nc.status.as_ref().unwrap();
        assert_eq!(status.phase.as_deref(), Some("Error"));
        assert!(!status.network_interfaces[0].dhcp_reserved);
        assert!(status.network_interfaces[1].dhcp_reserved);
        let message = status.message.as_deref().unwrap();
        assert!(message.starts_with("Failed to configure 1 of 2 MAC reservations"));
        assert!(message.contains(MAC_A));
        assert!(!message.contains(MAC_B));
    }

    #[tokio::test]
    async fn test_all_mac_errors_are_joined_into_one_message() {
        let h = harness(FakeStore::with_prefix(NAMESPACE, PREFIX), ReservationPolicy::default());
        h.kea.add_subnet(7, PREFIX);
        h.kea.fail_reservation_add(MAC_A, "host database is read-only");
        h.kea.fail_reservation_add(MAC_B, "host database is read-only");
        let mut nc = network_configuration(&[MAC_A, MAC_B]);

        pass(&h, &mut nc).await;

        assert_eq!(h.kea.calls(CMD_RESERVATION_ADD), 2);
        assert!(h.kea.reservations().is_empty());
        let message = nc.status.as_ref().unwrap().message.clone().unwrap();
        assert!(message.starts_with("Failed to configure 2 of 2 MAC reservations: "));
        assert!(message.contains(MAC_A));
        assert!(message.contains(MAC_B));
        assert_eq!(ready_condition(&nc), ("False".to_string(), Some("ReservationFailed".to_string())));
    }

    #[tokio::test]
    async fn test_unsupported_subnet_listing_stops_requeue() {
        let h = harness(FakeStore::with_prefix(NAMESPACE, PREFIX), ReservationPolicy::default());
        h.kea
            .override_command(CMD_SUBNET4_LIST, 2, "not supported for this dhcp engine");
        let mut nc = network_configuration(&[MAC_A]);

        let action = pass(&h, &mut nc).await;
        assert_eq!(action, ReconcileAction::Done);
        assert_eq!(
            ready_condition(&nc),
            ("False".to_string(), Some("KeaCommandUnsupported".to_string()))
        );
        assert_eq!(nc.status.as_ref().unwrap().phase.as_deref(), Some("Error"));
        let patches = h.store.patches();

        let action = pass(&h, &mut nc).await;
        assert_eq!(action, ReconcileAction::Done);
        assert_eq!(h.store.patches(), patches);
    }

    #[tokio::test]
    async fn test_unknown_subnet_requeues() {
        let h = harness(FakeStore::with_prefix(NAMESPACE, PREFIX), ReservationPolicy::default());
        h.kea.add_subnet(1, "10.0.0.0/16");
        let mut nc = network_configuration(&[MAC_A]);

        let action = pass(&h, &mut nc).await;

        assert_eq!(action, ReconcileAction::Requeue(Duration::from_secs(15)));
        assert_eq!(ready_condition(&nc).1.as_deref(), Some("SubnetNotFound"));
    }

    #[tokio::test]
    async fn test_missing_network_namespace_requeues() {
        let h = harness(FakeStore::default(), ReservationPolicy::default());
        let mut nc = network_configuration(&[MAC_A]);

        let action = pass(&h, &mut nc).await;

        assert_eq!(action, ReconcileAction::Requeue(Duration::from_secs(15)));
        assert_eq!(
            ready_condition(&nc).1.as_deref(),
            Some("NetworkNamespaceNotFound")
        );
        assert_eq!(h.kea.calls(CMD_SUBNET4_LIST), 0);
    }

    #[tokio::test]
    async fn test_no_valid_macs_is_ready_without_requeue() {
        let h = harness(FakeStore::with_prefix(NAMESPACE, PREFIX), ReservationPolicy::default());
        let mut nc = network_configuration(&["", "not-a-mac"]);

        let action = pass(&h, &mut nc).await;

        assert_eq!(action, ReconcileAction::Done);
        let status = nc.status.as_ref().unwrap();
        assert_eq!(status.message.as_deref(), Some("No MAC addresses to configure"));
        assert_eq!(ready_condition(&nc).0, "True");
        assert!(status.network_interfaces.iter().all(|i| !i.dhcp_reserved));
        assert_eq!(h.kea.calls(CMD_SUBNET4_LIST), 0);
    }

    #[tokio::test]
    async fn test_reconciling_mark_written_once_per_generation() {
        let h = harness(FakeStore::with_prefix(NAMESPACE, PREFIX), ReservationPolicy::default());
        h.kea.add_subnet(7, PREFIX);
        let mut nc = network_configuration(&[MAC_A]);

        pass(&h, &mut nc).await;
        let first = h.store.state.lock().unwrap().statuses[0].clone();
        assert_eq!(first.phase.as_deref(), Some("Reconciling"));
        assert_eq!(h.store.patches(), 2);

        nc.metadata.generation = Some(2);
        pass(&h, &mut nc).await;
        // New generation: mark Reconciling, then Ready again.
        assert_eq!(h.store.patches(), 4);
        assert_eq!(
            nc.status.as_ref().unwrap().conditions[0].observed_generation,
            Some(2)
        );
    }

    #[tokio::test]
    async fn test_created_timestamp_is_kept() {
        let h = harness(FakeStore::with_prefix(NAMESPACE, PREFIX), ReservationPolicy::default());
        h.kea.add_subnet(7, PREFIX);
        let mut nc = network_configuration(&[MAC_A]);

        pass(&h, &mut nc).await;
        let created = nc.status.as_ref().unwrap().created.clone();
        assert!(created.is_some());

        nc.metadata.generation = Some(2);
        pass(&h, &mut nc).await;
        assert_eq!(nc.status.as_ref().unwrap().created, created);
    }

    #[tokio::test]
    async fn test_deletion_removes_reservations_and_finalizer() {
        let h = harness(FakeStore::with_prefix(NAMESPACE, PREFIX), ReservationPolicy::default());
        h.kea.add_subnet(7, PREFIX);
        h.kea.add_reservation(7, MAC_A, Some("10.0.1.50"));
        h.kea.add_reservation(7, MAC_B, None);
        let mut nc = network_configuration(&[MAC_A, "AA-BB-CC-DD-EE-02"]);
        nc.metadata.deletion_timestamp = Some(Time(Timestamp::now()));

        let action = reconcile_network_configuration(&h.ctx, &nc).await.unwrap();

        assert_eq!(action, ReconcileAction::Done);
        assert!(h.kea.reservations().is_empty());
        assert_eq!(h.store.finalizer_removes(), 1);
        assert_eq!(h.store.patches(), 0);
    }

    #[tokio::test]
    async fn test_deletion_with_kea_unreachable_still_removes_finalizer() {
        let h = harness(FakeStore::with_prefix(NAMESPACE, PREFIX), ReservationPolicy::default());
        h.kea.set_unreachable(true);
        let mut nc = network_configuration(&[MAC_A]);
        nc.metadata.deletion_timestamp = Some(Time(Timestamp::now()));

        let action = reconcile_network_configuration(&h.ctx, &nc).await.unwrap();

        assert_eq!(action, ReconcileAction::Done);
        assert_eq!(h.store.finalizer_removes(), 1);
        assert_eq!(h.kea.calls(CMD_RESERVATION_DEL), 0);
    }

    #[tokio::test]
    async fn test_deletion_without_namespace_still_removes_finalizer() {
        let h = harness(FakeStore::default(), ReservationPolicy::default());
        let mut nc = network_configuration(&[MAC_A]);
        nc.metadata.deletion_timestamp = Some(Time(Timestamp::now()));

        reconcile_network_configuration(&h.ctx, &nc).await.unwrap();

        assert_eq!(h.store.finalizer_removes(), 1);
        assert_eq!(h.kea.calls(CMD_SUBNET4_LIST), 0);
    }

    #[tokio::test]
    async fn test_deletion_without_finalizer_does_nothing() {
        let h = harness(FakeStore::with_prefix(NAMESPACE, PREFIX), ReservationPolicy::default());
        let mut nc = network_configuration(&[MAC_A]);
        nc.metadata.finalizers = None;
        nc.metadata.deletion_timestamp = Some(Time(Timestamp::now()));

        reconcile_network_configuration(&h.ctx, &nc).await.unwrap();

        assert_eq!(h.store.finalizer_removes(), 0);
        assert_eq!(h.kea.calls(CMD_SUBNET4_LIST), 0);
    }

    #[tokio::test]
    async fn test_unreachable_kea_records_error_and_requeues() {
        let h = harness(FakeStore::with_prefix(NAMESPACE, PREFIX), ReservationPolicy::default());
        h.kea.set_unreachable(true);
        let mut nc = network_configuration(&[MAC_A]);

        let action = pass(&h, &mut nc).await;

        assert_eq!(action, ReconcileAction::Requeue(Duration::from_secs(15)));
        assert_eq!(ready_condition(&nc).1.as_deref(), Some("KeaUnreachable"));
    }
}
