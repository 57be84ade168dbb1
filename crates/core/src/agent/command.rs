//! Command-line construction from declarative argument specs
//!
//! Building is pure: the same config, task values and environment always
//! produce the same argument vector, and nothing is spawned until it succeeds.

use serde_json::Value;

use super::config::{AgentConfig, ArgSpec, ArgType, TaskConfig};
use super::error::ConfigError;

/// Build the full argument vector, including the executable, using the
/// process environment for `env_var` fallbacks
pub fn build_command(config: &AgentConfig, task: &TaskConfig) -> Result<Vec<String>, ConfigError> {
    config.validate()?;
    let mut command = vec![config.command.clone()];
    command.extend(build_args(config, task)?);
    Ok(command)
}

/// Build the arguments (without the executable) using the process environment
pub fn build_args(config: &AgentConfig, task: &TaskConfig) -> Result<Vec<String>, ConfigError> {
    build_args_with(config, task, |name| std::env::var(name).ok())
}

/// Build the arguments with an explicit environment lookup
pub fn build_args_with<F>(
    config: &AgentConfig,
    task: &TaskConfig,
    env: F,
) -> Result<Vec<String>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut args = Vec::new();

    // sort_by_key is stable, so equal positions keep declaration order
    let mut positional: Vec<&ArgSpec> = config.args.iter().filter(|a| a.positional).collect();
    positional.sort_by_key(|a| a.position);

    for spec in positional {
        let Some(value) = resolve_value(spec, task, &env) else {
            continue;
        };
        check_choices(spec, &value)?;
        match &value {
            Value::Array(items) if spec.variadic => args.extend(items.iter().map(render)),
            other => args.push(render(other)),
        }
    }

    for spec in config.args.iter().filter(|a| !a.positional) {
        let Some(value) = resolve_value(spec, task, &env) else {
            continue;
        };
        check_choices(spec, &value)?;

        let flag = spec.flag.as_str();
        match (spec.arg_type, &value) {
            (ArgType::Bool, value) => {
                if flag_enabled(value) && !flag.is_empty() {
                    args.push(flag.to_string());
                }
            }
            (_, Value::Array(items)) if spec.variadic => {
                for item in items {
                    if !flag.is_empty() {
                        args.push(flag.to_string());
                    }
                    args.push(render(item));
                }
            }
            (_, value) => {
                if !flag.is_empty() {
                    args.push(flag.to_string());
                }
                args.push(render(value));
            }
        }
    }

    Ok(args)
}

/// Task value, then environment fallback, then a non-falsy default
fn resolve_value<F>(spec: &ArgSpec, task: &TaskConfig, env: &F) -> Option<Value>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = task.get(&spec.name).filter(|v| !v.is_null()) {
        return Some(value.clone());
    }
    if let Some(value) = spec.env_var_name().and_then(env) {
        return Some(Value::String(value));
    }
    spec.default.as_ref().filter(|d| is_set(d)).cloned()
}

fn check_choices(spec: &ArgSpec, value: &Value) -> Result<(), ConfigError> {
    if spec.choices.is_empty() {
        return Ok(());
    }
    let candidates: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };
    for candidate in candidates {
        let rendered = render(candidate);
        if !spec.choices.iter().any(|choice| *choice == rendered) {
            return Err(ConfigError::InvalidChoice {
                arg: spec.name.clone(),
                value: rendered,
                choices: spec.choices.clone(),
            });
        }
    }
    Ok(())
}

/// String form of a value as it appears on the command line
pub(crate) fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Whether a default counts as configured
fn is_set(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Whether a boolean argument should emit its flag
fn flag_enabled(value: &Value) -> bool {
    match value {
        Value::String(s) => !matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "" | "0" | "false" | "no" | "off"
        ),
        other => is_set(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn task(value: Value) -> TaskConfig {
        match value {
            Value::Object(map) => map,
            _ => panic!("task must be an object"),
        }
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_mixed_argument_types() {
        let config = AgentConfig::new("test_agent", "test_cli")
            .with_arg(ArgSpec::flag("prompt", "--message").required())
            .with_arg(ArgSpec::flag("model", "--model").with_default("gpt-4"))
            .with_arg(ArgSpec::flag("files", "--file").required())
            .with_arg(ArgSpec::flag("no_git", "--no-git").with_type(ArgType::Bool).with_default(true))
            .with_arg(
                ArgSpec::flag("yes_always", "--yes-always")
                    .with_type(ArgType::Bool)
                    .with_default(true),
            );

        let task = task(json!({"prompt": "Add docstring", "files": "main.py", "model": "gpt-4o"}));
        let command = build_command(&config, &task).unwrap();

        assert_eq!(
            command,
            vec![
                "test_cli",
                "--message",
                "Add docstring",
                "--model",
                "gpt-4o",
                "--file",
                "main.py",
                "--no-git",
                "--yes-always",
            ]
        );
    }

    #[test]
    fn test_bool_flag_false_is_omitted() {
        let config = AgentConfig::new("test", "test_cli").with_arg(
            ArgSpec::flag("verbose", "--verbose")
                .with_type(ArgType::Bool)
                .with_default(false),
        );

        let args = build_args_with(&config, &TaskConfig::new(), no_env).unwrap();
        assert!(args.is_empty());

        let args = build_args_with(&config, &task(json!({"verbose": false})), no_env).unwrap();
        assert!(args.is_empty());
    }

    #[test]
    fn test_bool_flag_true_has_no_value() {
        let config = AgentConfig::new("test", "test_cli")
            .with_arg(ArgSpec::flag("model", "--model").with_default("m"))
            .with_arg(
                ArgSpec::flag("verbose", "--verbose")
                    .with_type(ArgType::Bool)
                    .with_default(false),
            );

        let args = build_args_with(&config, &task(json!({"verbose": true})), no_env).unwrap();
        assert_eq!(args, vec!["--model", "m", "--verbose"]);
        assert_eq!(args.iter().filter(|a| *a == "--verbose").count(), 1);
    }

    #[test]
    fn test_positional_args_come_first_in_position_order() {
        let config = AgentConfig::new("test", "codex")
            .with_arg(ArgSpec::flag("model", "--model"))
            .with_arg(ArgSpec::positional("prompt", 1))
            .with_arg(ArgSpec::positional("subcommand", 0).with_default("exec"));

        let args = build_args_with(
            &config,
            &task(json!({"prompt": "fix it", "model": "o3"})),
            no_env,
        )
        .unwrap();
        assert_eq!(args, vec!["exec", "fix it", "--model", "o3"]);
    }

    #[test]
    fn test_flagless_argument_is_appended_bare() {
        let config = AgentConfig::new("test", "test_cli")
            .with_arg(ArgSpec::flag("subcmd", "").with_default("run"))
            .with_arg(ArgSpec::flag("message", "-m"));

        let args = build_args_with(&config, &task(json!({"message": "hello"})), no_env).unwrap();
        assert_eq!(args, vec!["run", "-m", "hello"]);
    }

    #[test]
    fn test_variadic_repeats_flag_per_item() {
        let config = AgentConfig::new("test", "aider")
            .with_arg(ArgSpec::flag("files", "--file").variadic())
            .with_arg(ArgSpec::flag("paths", "").variadic());

        let args = build_args_with(
            &config,
            &task(json!({"files": ["a.rs", "b.rs", "c.rs"], "paths": ["x", "y"]})),
            no_env,
        )
        .unwrap();

        assert_eq!(args.iter().filter(|a| *a == "--file").count(), 3);
        assert_eq!(
            args,
            vec!["--file", "a.rs", "--file", "b.rs", "--file", "c.rs", "x", "y"]
        );
    }

    #[test]
    fn test_missing_optional_values_are_skipped() {
        let config = AgentConfig::new("test", "test_cli")
            .with_arg(ArgSpec::flag("prompt", "-p").required())
            .with_arg(ArgSpec::flag("optional", "--opt"))
            .with_arg(ArgSpec::flag("empty_default", "--empty").with_default(""));

        let args = build_args_with(&config, &task(json!({"prompt": "test", "optional": null})), no_env)
            .unwrap();
        assert_eq!(args, vec!["-p", "test"]);
    }

    #[test]
    fn test_env_var_fallback_sits_between_task_and_default() {
        let config = AgentConfig::new("test", "test_cli").with_arg(
            ArgSpec::flag("model", "--model")
                .with_env_var("TEST_MODEL")
                .with_default("default-model"),
        );
        let env = |name: &str| (name == "TEST_MODEL").then(|| "env-model".to_string());

        let args = build_args_with(&config, &TaskConfig::new(), env).unwrap();
        assert_eq!(args, vec!["--model", "env-model"]);

        let args = build_args_with(&config, &task(json!({"model": "task-model"})), env).unwrap();
        assert_eq!(args, vec!["--model", "task-model"]);

        let args = build_args_with(&config, &TaskConfig::new(), no_env).unwrap();
        assert_eq!(args, vec!["--model", "default-model"]);
    }

    #[test]
    fn test_bool_env_fallback_respects_falsy_strings() {
        let config = AgentConfig::new("test", "test_cli").with_arg(
            ArgSpec::flag("force", "--force")
                .with_type(ArgType::Bool)
                .with_env_var("FORCE"),
        );

        let off = build_args_with(&config, &TaskConfig::new(), |_| Some("false".to_string())).unwrap();
        assert!(off.is_empty());

        let on = build_args_with(&config, &TaskConfig::new(), |_| Some("1".to_string())).unwrap();
        assert_eq!(on, vec!["--force"]);
    }

    #[test]
    fn test_choice_violation_names_argument_and_value() {
        let config = AgentConfig::new("test", "test_cli").with_arg(
            ArgSpec::flag("format", "--output-format").with_choices(["text", "stream-json"]),
        );

        let err = build_args_with(&config, &task(json!({"format": "xml"})), no_env).unwrap_err();
        match &err {
            ConfigError::InvalidChoice { arg, value, .. } => {
                assert_eq!(arg, "format");
                assert_eq!(value, "xml");
            }
            other => panic!("Expected InvalidChoice, got {other:?}"),
        }
        assert!(err.to_string().contains("xml"));
    }

    #[test]
    fn test_choice_validation_checks_each_variadic_item() {
        let config = AgentConfig::new("test", "test_cli").with_arg(
            ArgSpec::flag("tools", "--tool")
                .variadic()
                .with_choices(["read", "write"]),
        );

        assert!(build_args_with(&config, &task(json!({"tools": ["read", "write"]})), no_env).is_ok());
        let err = build_args_with(&config, &task(json!({"tools": ["read", "rm"]})), no_env);
        assert!(matches!(err, Err(ConfigError::InvalidChoice { value, .. }) if value == "rm"));
    }

    #[test]
    fn test_numbers_render_as_json_text() {
        let config = AgentConfig::new("test", "test_cli")
            .with_arg(ArgSpec::flag("turns", "--max-turns").with_type(ArgType::Int))
            .with_arg(ArgSpec::flag("temperature", "--temperature").with_type(ArgType::Float));

        let args = build_args_with(
            &config,
            &task(json!({"turns": 5, "temperature": 0.5})),
            no_env,
        )
        .unwrap();
        assert_eq!(args, vec!["--max-turns", "5", "--temperature", "0.5"]);
    }

    #[test]
    fn test_build_is_deterministic() {
        let config = AgentConfig::builtin(super::super::config::AgentKey::Aider).unwrap();
        let task = task(json!({"prompt": "refactor", "files": ["a.py", "b.py"]}));

        let first = build_args_with(&config, &task, no_env).unwrap();
        let second = build_args_with(&config, &task, no_env).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_command_is_rejected() {
        let config = AgentConfig::new("broken", "  ");
        let err = build_command(&config, &TaskConfig::new()).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyCommand { .. }));
    }
}
