//! Integration tests for TOML configuration loading.
//!
//! Uses figment::Jail for safe, sandboxed env var manipulation.

use figment::{
    Figment, Jail,
    providers::{Env, Format, Serialized, Toml},
};
use lec_config::LecternConfig;
use lec_core::enums::WorkerRole;
use pretty_assertions::assert_eq;

#[test]
fn loads_pipeline_config_from_toml() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[pipeline]
worker_timeout_secs = 600
max_concurrent_workers = 2
reuse_valid_artifacts = false
"#,
        )?;

        let config: LecternConfig = Figment::from(Serialized::defaults(LecternConfig::default()))
            .merge(Toml::file("config.toml"))
            .extract()?;

        assert_eq!(config.pipeline.worker_timeout_secs, 600);
        assert_eq!(config.pipeline.max_concurrent_workers, 2);
        assert!(!config.pipeline.reuse_valid_artifacts);
        // Untouched keys keep their defaults
        assert!(config.pipeline.clean_with_evidence);
        Ok(())
    });
}

#[test]
fn loads_worker_commands_from_toml() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[workers.researcher]
command = ["agent-run", "--role", "researcher"]
env = { AGENT_MODEL = "large" }

[workers.writer]
command = ["agent-run", "--role", "writer"]
"#,
        )?;

        let config: LecternConfig = Figment::from(Serialized::defaults(LecternConfig::default()))
            .merge(Toml::file("config.toml"))
            .extract()?;

        let researcher = config.workers.for_role(WorkerRole::Researcher);
        assert_eq!(researcher.program(), Some("agent-run"));
        assert_eq!(
            researcher.env.get("AGENT_MODEL").map(String::as_str),
            Some("large")
        );
        assert!(config.workers.writer.is_configured());
        assert!(!config.workers.planner.is_configured());
        Ok(())
    });
}

#[test]
fn loads_validation_config_from_toml() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[validation]
min_annotation_chars = 80
placeholder_annotations = ["lorem ipsum"]
"#,
        )?;

        let config: LecternConfig = Figment::from(Serialized::defaults(LecternConfig::default()))
            .merge(Toml::file("config.toml"))
            .extract()?;

        assert_eq!(config.validation.min_annotation_chars, 80);
        assert_eq!(
            config.validation.placeholder_annotations,
            vec!["lorem ipsum".to_string()]
        );
        assert!(config.validation.require_annotation);
        Ok(())
    });
}

#[test]
fn project_config_is_picked_up_from_project_root() {
    Jail::expect_with(|jail| {
        std::fs::create_dir_all(jail.directory().join(".lectern"))
            .map_err(|e| e.to_string())?;
        jail.create_file(
            ".lectern/config.toml",
            r#"
[general]
output_dir = "out/reviews"
"#,
        )?;

        let config = LecternConfig::load_from(jail.directory()).map_err(|e| e.to_string())?;
        assert_eq!(config.general.output_dir, "out/reviews");
        assert_eq!(config.general.citation_style, "apa");
        Ok(())
    });
}

#[test]
fn env_var_overrides_toml() {
    Jail::expect_with(|jail| {
        jail.set_env("LECTERN_PIPELINE__WORKER_TIMEOUT_SECS", "90");

        jail.create_file(
            "config.toml",
            r#"
[pipeline]
worker_timeout_secs = 600
max_concurrent_workers = 8
"#,
        )?;

        let config: LecternConfig = Figment::from(Serialized::defaults(LecternConfig::default()))
            .merge(Toml::file("config.toml"))
            .merge(Env::prefixed("LECTERN_").split("__"))
            .extract()?;

        // Env should win over TOML
        assert_eq!(config.pipeline.worker_timeout_secs, 90);
        // TOML value not overridden by env should remain
        assert_eq!(config.pipeline.max_concurrent_workers, 8);
        Ok(())
    });
}

/// Documents the figment gotcha: typo'd env var keys are silently ignored.
#[test]
fn typo_env_var_silently_ignored() {
    Jail::expect_with(|jail| {
        jail.set_env("LECTERN_GENERAL__OUTPUTDIR", "typo");

        let config: LecternConfig = Figment::from(Serialized::defaults(LecternConfig::default()))
            .merge(Env::prefixed("LECTERN_").split("__"))
            .extract()?;

        assert_eq!(config.general.output_dir, "reviews");
        Ok(())
    });
}
