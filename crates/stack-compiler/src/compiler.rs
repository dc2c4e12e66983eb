//! Chart compiler contract and the manifest-based implementation.

use serde_json::{Value, json};
use stack_core::ImageInfo;
use stack_platform::{Chart, Dependency, Values};
use tracing::debug;

use crate::error::CompileResult;
use crate::manifest::{AppSection, StackManifest};
use crate::values::deep_merge;

/// Version stamped on generated stack charts.
pub const CHART_VERSION: &str = "0.1.0";

/// Version pinned for app dependencies the first time they appear.
pub const DEFAULT_DEPENDENCY_VERSION: &str = "latest";

/// Process launcher that buildpack images need in front of their command.
pub const LAUNCHER: &str = "launcher";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileOptions {
    pub stack_name: String,
    pub project_id: u64,
    /// Prefix commands with the buildpack launcher.
    pub inject_launcher: bool,
    /// Repository new app dependencies are pulled from.
    pub chart_repo_url: String,
}

/// Inputs for one compilation.
#[derive(Debug, Clone, Default)]
pub struct CompileInput {
    pub manifest: Vec<u8>,
    pub image: ImageInfo,
    /// Values of the prior release; only set for updates without override.
    pub prior_values: Option<Values>,
    /// Chart dependencies of the prior release; same rule as `prior_values`.
    pub prior_dependencies: Vec<Dependency>,
    pub options: CompileOptions,
}

/// Artifacts ready to hand to the platform.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledStack {
    pub chart: Chart,
    pub values: Values,
    /// Values for the release job; `None` or empty means no job release.
    pub job_values: Option<Values>,
}

/// Turns a manifest into deployable artifacts. Must not have side effects.
pub trait ChartCompiler: Send + Sync {
    fn compile(&self, input: &CompileInput) -> CompileResult<CompiledStack>;
}

/// Compiles `v1stack` manifests.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestCompiler;

impl ChartCompiler for ManifestCompiler {
    fn compile(&self, input: &CompileInput) -> CompileResult<CompiledStack> {
        let manifest = StackManifest::parse(&input.manifest)?;
        let env = json!(manifest.env_strings()?);
        let options = &input.options;

        let mut values = input.prior_values.clone().unwrap_or_default();

        // Sections of apps that left the manifest go with them.
        for dependency in &input.prior_dependencies {
            let key = dependency.values_key();
            if !manifest.apps.contains_key(key) {
                values.remove(key);
            }
        }

        let global = section_mut(&mut values, "global");
        global.insert(
            "stack".to_string(),
            json!({ "name": options.stack_name, "project_id": options.project_id }),
        );
        if !input.image.is_empty() {
            global.insert("image".to_string(), image_value(&input.image));
        }

        let mut dependencies = Vec::with_capacity(manifest.apps.len());
        for (name, app) in &manifest.apps {
            dependencies.push(dependency_for(name, app, &input.prior_dependencies, options));

            let section = section_mut(&mut values, name);
            deep_merge(section, app.config.clone());
            if !input.image.is_empty() {
                section.insert("image".to_string(), image_value(&input.image));
            }
            let container = section_mut(section, "container");
            if let Some(run) = &app.run {
                container.insert(
                    "command".to_string(),
                    json!(command(run, options.inject_launcher)),
                );
            }
            // Env is owned by the manifest; stale keys must not survive a merge.
            container.insert("env".to_string(), env.clone());
        }

        let image = values
            .get("global")
            .and_then(|global| global.get("image"))
            .cloned();

        let job_values = manifest.release.as_ref().map(|release| {
            let mut job = release.config.clone();
            if let Some(image) = &image {
                job.insert("image".to_string(), image.clone());
            }
            let container = section_mut(&mut job, "container");
            container.insert(
                "command".to_string(),
                json!(command(&release.run, options.inject_launcher)),
            );
            container.insert("env".to_string(), env.clone());
            job
        });

        let chart = Chart::new(&options.stack_name, CHART_VERSION).with_dependencies(dependencies);
        debug!(
            stack = %options.stack_name,
            apps = manifest.apps.len(),
            job = job_values.is_some(),
            "manifest compiled"
        );

        Ok(CompiledStack {
            chart,
            values,
            job_values,
        })
    }
}

/// Reuse the prior pin for an app that keeps its name and kind.
fn dependency_for(
    name: &str,
    app: &AppSection,
    prior: &[Dependency],
    options: &CompileOptions,
) -> Dependency {
    let chart_name = app.kind.chart_name();
    prior
        .iter()
        .find(|dep| dep.values_key() == name && dep.name == chart_name)
        .cloned()
        .unwrap_or_else(|| Dependency {
            name: chart_name.to_string(),
            version: DEFAULT_DEPENDENCY_VERSION.to_string(),
            repository: options.chart_repo_url.clone(),
            alias: Some(name.to_string()),
        })
}

fn command(run: &str, inject_launcher: bool) -> String {
    if inject_launcher && !run.starts_with(LAUNCHER) {
        format!("{LAUNCHER} {run}")
    } else {
        run.to_string()
    }
}

fn image_value(image: &ImageInfo) -> Value {
    json!({ "repository": image.repository, "tag": image.tag })
}

/// Object at `values[key]`, replacing anything that is not an object.
fn section_mut<'a>(values: &'a mut Values, key: &str) -> &'a mut Values {
    let entry = values
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Values::new()));
    if !entry.is_object() {
        *entry = Value::Object(Values::new());
    }
    match entry {
        Value::Object(map) => map,
        _ => unreachable!("entry was just made an object"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompileError;

    const MANIFEST: &[u8] = br#"
version: v1stack
env:
  PORT: 8080
apps:
  web:
    type: web
    run: node server.js
    config:
      replicas: 2
  worker:
    type: worker
    run: node worker.js
release:
  run: npm run migrate
"#;

    fn input(manifest: &[u8], image: ImageInfo) -> CompileInput {
        CompileInput {
            manifest: manifest.to_vec(),
            image,
            options: CompileOptions {
                stack_name: "api".to_string(),
                project_id: 7,
                inject_launcher: false,
                chart_repo_url: "https://charts.example.com".to_string(),
            },
            ..Default::default()
        }
    }

    #[test]
    fn compiles_fresh_stack() {
        let compiled = ManifestCompiler
            .compile(&input(MANIFEST, ImageInfo::new("ghcr.io/acme/api", "v1")))
            .unwrap();

        assert_eq!(compiled.chart.metadata.name, "api");
        let deps = &compiled.chart.metadata.dependencies;
        assert_eq!(deps.len(), 2);
        assert!(deps.iter().all(|d| d.repository == "https://charts.example.com"));
        assert_eq!(deps[0].values_key(), "web");
        assert_eq!(deps[1].name, "worker");

        let web = &compiled.values["web"];
        assert_eq!(web["replicas"], 2);
        assert_eq!(web["container"]["command"], "node server.js");
        assert_eq!(web["container"]["env"]["PORT"], "8080");
        assert_eq!(web["image"]["tag"], "v1");
        assert_eq!(compiled.values["global"]["image"]["repository"], "ghcr.io/acme/api");
        assert_eq!(compiled.values["global"]["stack"]["project_id"], 7);

        let job = compiled.job_values.unwrap();
        assert!(!job.is_empty());
        assert_eq!(job["container"]["command"], "npm run migrate");
        assert_eq!(job["image"]["tag"], "v1");
    }

    #[test]
    fn no_release_section_means_no_job() {
        let compiled = ManifestCompiler
            .compile(&input(
                b"version: v1stack\napps:\n  web:\n    type: web\n",
                ImageInfo::default(),
            ))
            .unwrap();
        assert!(compiled.job_values.is_none());
    }

    #[test]
    fn update_merges_over_prior_values() {
        let first = ManifestCompiler
            .compile(&input(MANIFEST, ImageInfo::new("ghcr.io/acme/api", "v1")))
            .unwrap();

        let mut prior = first.values.clone();
        prior.insert("ingress".to_string(), json!({ "hosts": ["api.example.com"] }));
        prior["web"]
            .as_object_mut()
            .unwrap()
            .insert("autoscaling".to_string(), json!({ "enabled": true }));

        let mut next = input(MANIFEST, ImageInfo::default());
        next.prior_values = Some(prior);
        next.prior_dependencies = first.chart.metadata.dependencies.clone();
        let compiled = ManifestCompiler.compile(&next).unwrap();

        // Unrelated fields survive, and the image carries over when none is given.
        assert_eq!(compiled.values["ingress"]["hosts"][0], "api.example.com");
        assert_eq!(compiled.values["web"]["autoscaling"]["enabled"], true);
        assert_eq!(compiled.values["web"]["image"]["tag"], "v1");
        assert_eq!(compiled.job_values.unwrap()["image"]["tag"], "v1");
    }

    #[test]
    fn compiling_twice_is_stable() {
        let first = ManifestCompiler
            .compile(&input(MANIFEST, ImageInfo::new("ghcr.io/acme/api", "v1")))
            .unwrap();

        let mut again = input(MANIFEST, ImageInfo::new("ghcr.io/acme/api", "v1"));
        again.prior_values = Some(first.values.clone());
        again.prior_dependencies = first.chart.metadata.dependencies.clone();
        let second = ManifestCompiler.compile(&again).unwrap();

        assert_eq!(first.values, second.values);
        assert_eq!(first.chart, second.chart);
    }

    #[test]
    fn reuses_prior_dependency_pins_and_drops_removed_apps() {
        let mut next = input(
            b"version: v1stack\napps:\n  web:\n    type: web\n    run: serve\n",
            ImageInfo::default(),
        );
        next.prior_dependencies = vec![
            Dependency {
                name: "web".to_string(),
                version: "0.50.0".to_string(),
                repository: "https://old.example.com".to_string(),
                alias: Some("web".to_string()),
            },
            Dependency {
                name: "worker".to_string(),
                version: "0.20.0".to_string(),
                repository: "https://old.example.com".to_string(),
                alias: Some("worker".to_string()),
            },
        ];
        let mut prior = Values::new();
        prior.insert("worker".to_string(), json!({ "replicas": 1 }));
        prior.insert("web".to_string(), json!({ "replicas": 4 }));
        next.prior_values = Some(prior);

        let compiled = ManifestCompiler.compile(&next).unwrap();
        let deps = &compiled.chart.metadata.dependencies;
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].version, "0.50.0");
        assert!(!compiled.values.contains_key("worker"));
        assert_eq!(compiled.values["web"]["replicas"], 4);
    }

    #[test]
    fn stale_env_keys_are_dropped() {
        let mut prior = Values::new();
        prior.insert(
            "web".to_string(),
            json!({ "container": { "env": { "OLD": "1" } } }),
        );
        let mut next = input(
            b"version: v1stack\nenv:\n  NEW: '2'\napps:\n  web:\n    type: web\n",
            ImageInfo::default(),
        );
        next.prior_values = Some(prior);

        let compiled = ManifestCompiler.compile(&next).unwrap();
        let env = compiled.values["web"]["container"]["env"].as_object().unwrap();
        assert_eq!(env.len(), 1);
        assert_eq!(env["NEW"], "2");
    }

    #[test]
    fn injects_launcher() {
        let mut launched = input(MANIFEST, ImageInfo::default());
        launched.options.inject_launcher = true;
        let compiled = ManifestCompiler.compile(&launched).unwrap();
        assert_eq!(compiled.values["web"]["container"]["command"], "launcher node server.js");
        assert_eq!(
            compiled.job_values.unwrap()["container"]["command"],
            "launcher npm run migrate"
        );
    }

    #[test]
    fn manifest_errors_propagate() {
        let err = ManifestCompiler
            .compile(&input(b"version: v0\n", ImageInfo::default()))
            .unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedVersion { .. }));
    }
}
