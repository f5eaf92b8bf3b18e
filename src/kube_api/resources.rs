use k8s_openapi::api::core::v1::{Namespace, Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

pub const SERVICE_PORT_NAME: &str = "http";
const PROTOCOL_TCP: &str = "TCP";
const SERVICE_TYPE_CLUSTER_IP: &str = "ClusterIP";

/// Cluster-internal service exposing a single TCP port to the selected pods.
pub fn build_service(
    name: &str,
    namespace: &str,
    port: i32,
    selector: BTreeMap<String, String>,
) -> Service {
    Service {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            selector: Some(selector),
            ports: Some(vec![ServicePort {
                name: Some(SERVICE_PORT_NAME.to_string()),
                port,
                protocol: Some(PROTOCOL_TCP.to_string()),
                ..Default::default()
            }]),
            type_: Some(SERVICE_TYPE_CLUSTER_IP.to_string()),
            ..Default::default()
        }),
        status: None,
    }
}

pub fn build_namespace(name: &str) -> Namespace {
    Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        ..Default::default()
    }
}
