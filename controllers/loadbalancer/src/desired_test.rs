//! Unit tests for desired module

#[cfg(test)]
mod tests {
    use crate::desired::*;
    use crate::error::ReconcileError;
    use crate::test_utils::{cluster_info, create_test_service};
    use k8s_openapi::api::core::v1::ServicePort;

    #[test]
    fn test_from_service_defaults() {
        let service = create_test_service("web", "default", &[(80, Some(30080))], &[]);
        let desired = DesiredSpec::from_service(&service, vec!["cs-1".to_string()], &cluster_info()).unwrap();

        assert_eq!(desired.name, "a1b2c3d4e5f60718293a4b5c6d7e8f90");
        assert_eq!(desired.name.len(), 32);
        assert_eq!(desired.balancing_algorithm, "round_robin");
        assert_eq!(desired.datacenter_id, "dc-1");
        assert_eq!(desired.private_network_id.as_deref(), Some("pn-1"));
        assert_eq!(
            desired.listeners,
            vec![ListenerMapping {
                external_protocol: "tcp".to_string(),
                external_port: 80,
                internal_protocol: "tcp".to_string(),
                internal_port: 30080,
            }]
        );
        assert!(desired.health_check.is_none());
        assert_eq!(desired.targets, vec!["cs-1"]);
        assert!(desired.adoptable);
    }

    #[test]
    fn test_annotations_override_name_and_algorithm() {
        let service = create_test_service(
            "web",
            "default",
            &[(443, Some(30443))],
            &[(ANNOTATION_NAME, "edge"), (ANNOTATION_BALANCING_ALGORITHM, "least_connections")],
        );
        let desired = DesiredSpec::from_service(&service, vec![], &cluster_info()).unwrap();
        assert_eq!(desired.name, "edge");
        assert_eq!(desired.balancing_algorithm, "least_connections");
        assert!(!desired.adoptable);
    }

    #[test]
    fn test_missing_ports_is_validation_error() {
        let service = create_test_service("web", "default", &[], &[]);
        let err = DesiredSpec::from_service(&service, vec![], &cluster_info()).unwrap_err();
        assert!(matches!(err, ReconcileError::Validation(_)));
    }

    #[test]
    fn test_missing_node_port_is_validation_error() {
        let service = create_test_service("web", "default", &[(80, None)], &[]);
        let err = DesiredSpec::from_service(&service, vec![], &cluster_info()).unwrap_err();
        assert!(!err.is_retryable());
        assert!(matches!(err, ReconcileError::Validation(msg) if msg.contains("nodePort")));
    }

    #[test]
    fn test_duplicate_port_is_validation_error() {
        let service = create_test_service("web", "default", &[(80, Some(30080)), (80, Some(30081))], &[]);
        assert!(DesiredSpec::from_service(&service, vec![], &cluster_info()).is_err());
    }

    #[test]
    fn test_protocol_is_lowercased() {
        let mut service = create_test_service("dns", "default", &[], &[]);
        service.spec.as_mut().unwrap().ports = Some(vec![ServicePort {
            port: 53,
            node_port: Some(30053),
            protocol: Some("UDP".to_string()),
            ..Default::default()
        }]);
        let desired = DesiredSpec::from_service(&service, vec![], &cluster_info()).unwrap();
        assert_eq!(desired.listeners[0].external_protocol, "udp");
        assert_eq!(desired.listeners[0].internal_protocol, "udp");
    }

    #[test]
    fn test_health_check_policy_parsed_when_enabled() {
        let service = create_test_service(
            "web",
            "default",
            &[(80, Some(30080))],
            &[
                (ANNOTATION_HEALTHCHECK_ENABLED, "true"),
                (ANNOTATION_HEALTHCHECK_TYPE, "http"),
                (ANNOTATION_HEALTHCHECK_URL, "/healthz"),
                (ANNOTATION_HEALTHCHECK_INTERVAL, "10"),
                (ANNOTATION_HEALTHCHECK_TIMEOUT, "5"),
                (ANNOTATION_HEALTHCHECK_UNHEALTHY_THRESHOLD, "3"),
                (ANNOTATION_HEALTHCHECK_HEALTHY_THRESHOLD, "2"),
                (ANNOTATION_HEALTHCHECK_PORT, "30080"),
            ],
        );
        let policy = DesiredSpec::from_service(&service, vec![], &cluster_info())
            .unwrap()
            .health_check
            .unwrap();
        assert_eq!(policy.check_type, "http");
        assert_eq!(policy.url, "/healthz");
        assert_eq!(policy.interval, 10);
        assert_eq!(policy.timeout, 5);
        assert_eq!(policy.unhealthy_threshold, 3);
        assert_eq!(policy.healthy_threshold, 2);
        assert_eq!(policy.port, 30080);
    }

    #[test]
    fn test_non_numeric_health_check_field_is_validation_error() {
        let service = create_test_service(
            "web",
            "default",
            &[(80, Some(30080))],
            &[(ANNOTATION_HEALTHCHECK_ENABLED, "true"), (ANNOTATION_HEALTHCHECK_INTERVAL, "ten")],
        );
        let err = DesiredSpec::from_service(&service, vec![], &cluster_info()).unwrap_err();
        assert!(matches!(err, ReconcileError::Validation(msg) if msg.contains("interval")));
    }

    #[test]
    fn test_unparsable_enable_flag_disables_health_check() {
        let service = create_test_service(
            "web",
            "default",
            &[(80, Some(30080))],
            &[(ANNOTATION_HEALTHCHECK_ENABLED, "yes please"), (ANNOTATION_HEALTHCHECK_INTERVAL, "ten")],
        );
        let desired = DesiredSpec::from_service(&service, vec![], &cluster_info()).unwrap();
        assert!(desired.health_check.is_none());
    }

    #[test]
    fn test_targets_are_deduplicated_in_order() {
        let service = create_test_service("web", "default", &[(80, Some(30080))], &[]);
        let targets = vec!["cs-2".to_string(), "cs-1".to_string(), "cs-2".to_string()];
        let desired = DesiredSpec::from_service(&service, targets, &cluster_info()).unwrap();
        assert_eq!(desired.targets, vec!["cs-2", "cs-1"]);
    }

    #[test]
    fn test_create_request_carries_everything() {
        let service = create_test_service(
            "web",
            "default",
            &[(80, Some(30080))],
            &[(ANNOTATION_HEALTHCHECK_ENABLED, "1")],
        );
        let desired = DesiredSpec::from_service(&service, vec!["cs-1".to_string()], &cluster_info()).unwrap();
        let request = desired.create_request();
        assert!(request.create_public_ip_address);
        assert_eq!(request.private_network_ids, vec!["pn-1"]);
        assert_eq!(request.forwarding_rules.len(), 1);
        assert_eq!(request.health_checks.len(), 1);
        assert_eq!(request.backend_nodes[0].cloud_server_id, "cs-1");
    }

    #[test]
    fn test_load_balancer_id_defaults_to_empty() {
        let service = create_test_service("web", "default", &[(80, Some(30080))], &[]);
        assert_eq!(load_balancer_id(&service), "");

        let bound = create_test_service("web", "default", &[(80, Some(30080))], &[(ANNOTATION_ID, "lb-7")]);
        assert_eq!(load_balancer_id(&bound), "lb-7");
    }

    #[test]
    fn test_parse_bool_spellings() {
        assert_eq!(parse_bool("True"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("yes"), None);
    }
}
