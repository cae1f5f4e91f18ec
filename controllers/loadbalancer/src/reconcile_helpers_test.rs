//! Unit tests for reconcile_helpers module

#[cfg(test)]
mod tests {
    use crate::reconcile_helpers::*;
    use crate::reconciler::lifecycle::LoadBalancerStatus;
    use crate::test_utils::create_test_service;
    use k8s_openapi::api::core::v1::{LoadBalancerIngress, LoadBalancerStatus as K8sLoadBalancerStatus, ServiceStatus};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;

    fn status(addresses: &[&str]) -> LoadBalancerStatus {
        LoadBalancerStatus {
            ingress: addresses.iter().map(|a| a.to_string()).collect(),
        }
    }

    #[test]
    fn test_service_key_defaults_namespace() {
        let mut service = create_test_service("web", "shop", &[(80, Some(30080))], &[]);
        assert_eq!(service_key(&service).unwrap().to_string(), "shop/web");

        service.metadata.namespace = None;
        assert_eq!(service_key(&service).unwrap().to_string(), "default/web");

        service.metadata.name = None;
        assert!(service_key(&service).is_err());
    }

    #[test]
    fn test_only_classless_load_balancer_services_are_wanted() {
        let mut service = create_test_service("web", "default", &[(80, Some(30080))], &[]);
        assert!(wants_load_balancer(&service));

        service.spec.as_mut().unwrap().load_balancer_class = Some("example.com/other".to_string());
        assert!(!wants_load_balancer(&service));

        let mut service = create_test_service("web", "default", &[(80, Some(30080))], &[]);
        service.spec.as_mut().unwrap().type_ = Some("NodePort".to_string());
        assert!(!wants_load_balancer(&service));
    }

    #[test]
    fn test_finalizer_patches() {
        let mut service = create_test_service("web", "default", &[(80, Some(30080))], &[]);
        service.metadata.finalizers = Some(vec!["example.com/keep".to_string()]);
        assert!(!has_finalizer(&service));

        let patch = add_finalizer_patch(&service);
        assert_eq!(
            patch,
            serde_json::json!({
                "metadata": {
                    "resourceVersion": "1",
                    "finalizers": ["example.com/keep", FINALIZER],
                }
            })
        );

        service.metadata.finalizers = Some(vec!["example.com/keep".to_string(), FINALIZER.to_string()]);
        assert!(has_finalizer(&service));
        assert_eq!(
            remove_finalizer_patch(&service)["metadata"]["finalizers"],
            serde_json::json!(["example.com/keep"])
        );
        assert_eq!(add_finalizer_patch(&service)["metadata"]["finalizers"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_needs_cleanup() {
        let mut service = create_test_service("web", "default", &[(80, Some(30080))], &[]);
        assert!(!needs_cleanup(&service));

        service.metadata.finalizers = Some(vec![FINALIZER.to_string()]);
        assert!(!needs_cleanup(&service));

        service.spec.as_mut().unwrap().type_ = Some("ClusterIP".to_string());
        assert!(needs_cleanup(&service));

        let mut service = create_test_service("web", "default", &[(80, Some(30080))], &[]);
        service.metadata.deletion_timestamp = Some(Time(Default::default()));
        assert!(!needs_cleanup(&service));
        service.metadata.finalizers = Some(vec![FINALIZER.to_string()]);
        assert!(needs_cleanup(&service));
    }

    #[test]
    fn test_ingress_entries_split_ips_and_hostnames() {
        let entries = ingress_entries(&status(&["203.0.113.10", "2001:db8::1", "lb.example.com"]));
        assert_eq!(entries[0].ip.as_deref(), Some("203.0.113.10"));
        assert_eq!(entries[1].ip.as_deref(), Some("2001:db8::1"));
        assert_eq!(entries[2].hostname.as_deref(), Some("lb.example.com"));
        assert!(entries[2].ip.is_none());
    }

    #[test]
    fn test_ingress_needs_update() {
        let mut service = create_test_service("web", "default", &[(80, Some(30080))], &[]);
        assert!(ingress_needs_update(&service, &status(&["203.0.113.10"])));
        assert!(!ingress_needs_update(&service, &status(&[])));

        service.status = Some(ServiceStatus {
            load_balancer: Some(K8sLoadBalancerStatus {
                ingress: Some(vec![LoadBalancerIngress {
                    ip: Some("203.0.113.10".to_string()),
                    ..Default::default()
                }]),
            }),
            ..Default::default()
        });
        assert!(!ingress_needs_update(&service, &status(&["203.0.113.10"])));
        assert!(ingress_needs_update(&service, &status(&["203.0.113.11"])));
    }

    #[test]
    fn test_ingress_status_patch() {
        assert_eq!(
            ingress_status_patch(&status(&["203.0.113.10"])),
            serde_json::json!({
                "status": {
                    "loadBalancer": {
                        "ingress": [{"ip": "203.0.113.10"}],
                    }
                }
            })
        );
        assert_eq!(
            ingress_status_patch(&status(&[]))["status"]["loadBalancer"]["ingress"],
            serde_json::json!([])
        );
    }
}
