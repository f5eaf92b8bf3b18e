



#[cfg(test)]
pub mod test_helpers {
    use crate::kube_api::{Cluster, KubeApi, PodEvent, PodEvents};
    use async_trait::async_trait;
    use futures::StreamExt;
    use futures::stream;
    use k8s_openapi::api::batch::v1::Job;
    use k8s_openapi::api::core::v1::{Namespace, Pod, Service, ServiceAccount};
    use k8s_openapi::api::networking::v1::Ingress;
    use k8s_openapi::api::rbac::v1::{Role, RoleBinding};
    use kube::ResourceExt;
    use kube::api::{DeleteParams, PropagationPolicy};
    use kube::core::ErrorResponse;
    use serde_json::json;
    use std::collections::{BTreeMap, BTreeSet, HashMap};
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Call {
        CreateJob { namespace: String, name: String },
        GetJob { namespace: String, name: String },
        DeleteJob { namespace: String, name: String },
        CreatePod { namespace: String, name: String },
        ListPods { namespace: String, selector: Option<String> },
        DeletePod { namespace: String, name: String, foreground: bool },
        WatchPods { namespace: String, selector: String },
        ListNamespaces,
        CreateNamespace { name: String },
        ListServices { namespace: String },
        CreateService { namespace: String, name: String },
        ListIngresses { namespace: String },
        CreateRole { namespace: String, name: String },
        CreateServiceAccount { namespace: String, name: String },
        CreateRoleBinding { namespace: String, name: String },
    }

    type Key = (String, String);

    #[derive(Default)]
    struct State {
        calls: Vec<Call>,
        next_uid: u32,
        jobs: BTreeMap<Key, Job>,
        pods: BTreeMap<Key, Pod>,
        services: BTreeMap<Key, Service>,
        ingresses: BTreeMap<Key, Ingress>,
        namespaces: BTreeSet<String>,
        roles: BTreeSet<Key>,
        service_accounts: BTreeSet<Key>,
        role_bindings: BTreeSet<Key>,
        events: Vec<Result<PodEvent, (u16, String)>>,
        keep_watch_open: bool,
        failing_watch: Option<(u16, String)>,
        failing_deletes: HashMap<String, usize>,
        failing_pod_create: Option<(u16, String)>,
    }

    /// In-memory control plane recording every call made through it.
    #[derive(Default)]
    pub struct FakeCluster {
        state: Mutex<State>,
    }

    pub fn api_error(code: u16, reason: &str) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: format!("{} ({})", reason, code),
            reason: reason.to_string(),
            code,
        })
    }

    fn key(namespace: &str, name: &str) -> Key {
        (namespace.to_string(), name.to_string())
    }

    fn matches_selector(pod: &Pod, selector: Option<&str>) -> bool {
        let Some((label, value)) = selector.and_then(|s| s.split_once('=')) else {
            return true;
        };
        pod.labels().get(label).map(String::as_str) == Some(value)
    }

    pub fn pod(namespace: &str, job_name: &str, name: &str, phase: &str) -> Pod {
        serde_json::from_value(json!({
            "apiVersion": "v1",
            "kind": "Pod",
            "metadata": {
                "name": name,
                "namespace": namespace,
                "labels": { "job-name": job_name },
            },
            "spec": { "containers": [{ "name": job_name, "image": "busybox:1.28" }] },
            "status": { "phase": phase },
        }))
        .unwrap()
    }

    pub fn api_with(cluster: &Arc<FakeCluster>) -> KubeApi {
        KubeApi::new(cluster.clone())
    }

    impl FakeCluster {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub fn add_pod(&self, pod: Pod) {
            let mut state = self.state.lock().unwrap();
            let namespace = pod.namespace().unwrap_or_default();
            state.pods.insert(key(&namespace, &pod.name_any()), pod);
        }

        pub fn add_service(&self, service: Service) {
            let mut state = self.state.lock().unwrap();
            let namespace = service.namespace().unwrap_or_default();
            state.services.insert(key(&namespace, &service.name_any()), service);
        }

        pub fn add_ingress(&self, ingress: Ingress) {
            let mut state = self.state.lock().unwrap();
            let namespace = ingress.namespace().unwrap_or_default();
            state.ingresses.insert(key(&namespace, &ingress.name_any()), ingress);
        }

        pub fn add_namespace(&self, name: &str) {
            self.state.lock().unwrap().namespaces.insert(name.to_string());
        }

        pub fn push_event(&self, event: PodEvent) {
            self.state.lock().unwrap().events.push(Ok(event));
        }

        /// Script a refusal delivered through an already open watch.
        pub fn push_watch_refusal(&self, code: u16, reason: &str) {
            self.state.lock().unwrap().events.push(Err((code, reason.to_string())));
        }

        /// Make opening the watch fail.
        pub fn fail_watch(&self, code: u16, reason: &str) {
            self.state.lock().unwrap().failing_watch = Some((code, reason.to_string()));
        }

        /// Keep the watch stream pending once the scripted events are exhausted.
        pub fn keep_watch_open(&self) {
            self.state.lock().unwrap().keep_watch_open = true;
        }

        pub fn fail_delete(&self, pod_name: &str, times: usize) {
            self.state
                .lock()
                .unwrap()
                .failing_deletes
                .insert(pod_name.to_string(), times);
        }

        pub fn fail_pod_create(&self, code: u16, reason: &str) {
            self.state.lock().unwrap().failing_pod_create = Some((code, reason.to_string()));
        }

        pub fn calls(&self) -> Vec<Call> {
            self.state.lock().unwrap().calls.clone()
        }

        pub fn delete_pod_calls(&self) -> Vec<Call> {
            self.calls()
                .into_iter()
                .filter(|call| matches!(call, Call::DeletePod { .. }))
                .collect()
        }

        pub fn job(&self, namespace: &str, name: &str) -> Option<Job> {
            self.state.lock().unwrap().jobs.get(&key(namespace, name)).cloned()
        }

        pub fn stored_pod(&self, namespace: &str, name: &str) -> Option<Pod> {
            self.state.lock().unwrap().pods.get(&key(namespace, name)).cloned()
        }

        pub fn stored_service(&self, namespace: &str, name: &str) -> Option<Service> {
            self.state.lock().unwrap().services.get(&key(namespace, name)).cloned()
        }

        pub fn has_namespace(&self, name: &str) -> bool {
            self.state.lock().unwrap().namespaces.contains(name)
        }

        fn record(&self, call: Call) {
            self.state.lock().unwrap().calls.push(call);
        }
    }

    #[async_trait]
    impl Cluster for FakeCluster {
        async fn create_job(&self, namespace: &str, job: &Job) -> kube::Result<Job> {
            let name = job.name_any();
            self.record(Call::CreateJob { namespace: namespace.to_string(), name: name.clone() });
            let mut state = self.state.lock().unwrap();
            if state.jobs.contains_key(&key(namespace, &name)) {
                return Err(api_error(409, "AlreadyExists"));
            }
            state.next_uid += 1;
            let mut created = job.clone();
            created.metadata.uid = Some(format!("uid-{}", state.next_uid));
            created.metadata.namespace = Some(namespace.to_string());
            state.jobs.insert(key(namespace, &name), created.clone());
            Ok(created)
        }

        async fn get_job(&self, namespace: &str, name: &str) -> kube::Result<Job> {
            self.record(Call::GetJob { namespace: namespace.to_string(), name: name.to_string() });
            self.job(namespace, name)
                .ok_or_else(|| api_error(404, "NotFound"))
        }

        async fn delete_job(&self, namespace: &str, name: &str) -> kube::Result<()> {
            self.record(Call::DeleteJob { namespace: namespace.to_string(), name: name.to_string() });
            let mut state = self.state.lock().unwrap();
            state
                .jobs
                .remove(&key(namespace, name))
                .map(|_| ())
                .ok_or_else(|| api_error(404, "NotFound"))
        }

        async fn create_pod(&self, namespace: &str, pod: &Pod) -> kube::Result<Pod> {
            let name = pod.name_any();
            self.record(Call::CreatePod { namespace: namespace.to_string(), name: name.clone() });
            let mut state = self.state.lock().unwrap();
            if let Some((code, reason)) = &state.failing_pod_create {
                return Err(api_error(*code, reason));
            }
            if state.pods.contains_key(&key(namespace, &name)) {
                return Err(api_error(409, "AlreadyExists"));
            }
            state.pods.insert(key(namespace, &name), pod.clone());
            Ok(pod.clone())
        }

        async fn list_pods(&self, namespace: &str, selector: Option<&str>) -> kube::Result<Vec<Pod>> {
            self.record(Call::ListPods {
                namespace: namespace.to_string(),
                selector: selector.map(str::to_string),
            });
            let state = self.state.lock().unwrap();
            Ok(state
                .pods
                .iter()
                .filter(|((ns, _), pod)| ns == namespace && matches_selector(pod, selector))
                .map(|(_, pod)| pod.clone())
                .collect())
        }

        async fn delete_pod(
            &self,
            namespace: &str,
            name: &str,
            params: &DeleteParams,
        ) -> kube::Result<()> {
            let foreground = matches!(params.propagation_policy, Some(PropagationPolicy::Foreground));
            self.record(Call::DeletePod {
                namespace: namespace.to_string(),
                name: name.to_string(),
                foreground,
            });
            let mut state = self.state.lock().unwrap();
            if let Some(remaining) = state.failing_deletes.get_mut(name) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(api_error(500, "InternalError"));
                }
            }
            state
                .pods
                .remove(&key(namespace, name))
                .map(|_| ())
                .ok_or_else(|| api_error(404, "NotFound"))
        }

        async fn watch_pods(&self, namespace: &str, selector: &str) -> kube::Result<PodEvents> {
            self.record(Call::WatchPods {
                namespace: namespace.to_string(),
                selector: selector.to_string(),
            });
            let state = self.state.lock().unwrap();
            if let Some((code, reason)) = &state.failing_watch {
                return Err(api_error(*code, reason));
            }
            let events = stream::iter(state.events.clone()).map(|event| {
                event.map_err(|(code, reason)| api_error(code, &reason))
            });
            if state.keep_watch_open {
                Ok(events.chain(stream::pending()).boxed())
            } else {
                Ok(events.boxed())
            }
        }

        async fn list_namespaces(&self) -> kube::Result<Vec<Namespace>> {
            self.record(Call::ListNamespaces);
            let state = self.state.lock().unwrap();
            Ok(state
                .namespaces
                .iter()
                .map(|name| crate::kube_api::resources::build_namespace(name))
                .collect())
        }

        async fn create_namespace(&self, namespace: &Namespace) -> kube::Result<Namespace> {
            let name = namespace.name_any();
            self.record(Call::CreateNamespace { name: name.clone() });
            let mut state = self.state.lock().unwrap();
            if !state.namespaces.insert(name) {
                return Err(api_error(409, "AlreadyExists"));
            }
            Ok(namespace.clone())
        }

        async fn list_services(&self, namespace: &str) -> kube::Result<Vec<Service>> {
            self.record(Call::ListServices { namespace: namespace.to_string() });
            let state = self.state.lock().unwrap();
            Ok(state
                .services
                .iter()
                .filter(|((ns, _), _)| ns == namespace)
                .map(|(_, service)| service.clone())
                .collect())
        }

        async fn create_service(&self, namespace: &str, service: &Service) -> kube::Result<Service> {
            let name = service.name_any();
            self.record(Call::CreateService { namespace: namespace.to_string(), name: name.clone() });
            let mut state = self.state.lock().unwrap();
            if state.services.contains_key(&key(namespace, &name)) {
                return Err(api_error(409, "AlreadyExists"));
            }
            state.services.insert(key(namespace, &name), service.clone());
            Ok(service.clone())
        }

        async fn list_ingresses(&self, namespace: &str) -> kube::Result<Vec<Ingress>> {
            self.record(Call::ListIngresses { namespace: namespace.to_string() });
            let state = self.state.lock().unwrap();
            Ok(state
                .ingresses
                .iter()
                .filter(|((ns, _), _)| ns == namespace)
                .map(|(_, ingress)| ingress.clone())
                .collect())
        }

        async fn create_role(&self, namespace: &str, role: &Role) -> kube::Result<Role> {
            let name = role.name_any();
            self.record(Call::CreateRole { namespace: namespace.to_string(), name: name.clone() });
            if !self.state.lock().unwrap().roles.insert(key(namespace, &name)) {
                return Err(api_error(409, "AlreadyExists"));
            }
            Ok(role.clone())
        }

        async fn create_service_account(
            &self,
            namespace: &str,
            account: &ServiceAccount,
        ) -> kube::Result<ServiceAccount> {
            let name = account.name_any();
            self.record(Call::CreateServiceAccount {
                namespace: namespace.to_string(),
                name: name.clone(),
            });
            if !self.state.lock().unwrap().service_accounts.insert(key(namespace, &name)) {
                return Err(api_error(409, "AlreadyExists"));
            }
            Ok(account.clone())
        }

        async fn create_role_binding(
            &self,
            namespace: &str,
            binding: &RoleBinding,
        ) -> kube::Result<RoleBinding> {
            let name = binding.name_any();
            self.record(Call::CreateRoleBinding {
                namespace: namespace.to_string(),
                name: name.clone(),
            });
            if !self.state.lock().unwrap().role_bindings.insert(key(namespace, &name)) {
                return Err(api_error(409, "AlreadyExists"));
            }
            Ok(binding.clone())
        }
    }
}
