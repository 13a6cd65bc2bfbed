use lec_config::LecternConfig;

/// Emit warnings for worker roles with no command and for likely mistyped env
/// var keys that silently fell back to defaults.
pub fn warn_unconfigured(config: &LecternConfig) {
    for warning in collect_unconfigured_warnings(config, std::env::vars()) {
        tracing::warn!("{warning}");
    }
}

fn collect_unconfigured_warnings<I>(config: &LecternConfig, env: I) -> Vec<String>
where
    I: IntoIterator<Item = (String, String)>,
{
    let env_keys = env.into_iter().map(|(key, _)| key).collect::<Vec<_>>();
    let unconfigured = config.workers.unconfigured_roles();

    let mut warnings = Vec::new();

    if !unconfigured.is_empty() && has_single_underscore_key(&env_keys, "LECTERN_WORKERS") {
        warnings.push(
            "Worker config appears default while LECTERN_WORKERS* env vars exist. Use double underscores (example: LECTERN_WORKERS__PLANNER__COMMAND)."
                .to_string(),
        );
    }

    for role in unconfigured {
        warnings.push(format!(
            "No command configured for the {role} worker; set [workers.{role}] in .lectern/config.toml."
        ));
    }

    warnings
}

fn has_single_underscore_key(keys: &[String], prefix: &str) -> bool {
    keys.iter()
        .any(|key| key.starts_with(prefix) && !key.starts_with(&format!("{prefix}__")))
}
