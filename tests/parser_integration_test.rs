use cmdtree::types::{self, Value};
use cmdtree::{Argument, Command, CommandManager, DefinitionSpec, Input, InputParseFail, ParseFail, Syntax, TypeRegistry, tokenize};
use std::sync::Arc;
use std::thread;

fn file_manager() -> CommandManager {
    let mut manager = CommandManager::new();
    manager
        .register(
            Command::builder("file")
                .description("file operations")
                .sub_command(
                    Command::builder("copy")
                        .alias("cp")
                        .argument(Argument::new("recursive", types::boolean()).alias("r").optional())
                        .argument(Argument::new("sources", types::list(types::string())))
                        .argument(Argument::new("target", types::string())),
                )
                .sub_command(
                    Command::builder("remove")
                        .alias("rm")
                        .argument(Argument::new("recursive", types::boolean()).alias("r")),
                ),
        )
        .unwrap();
    manager
        .register(Command::builder("echo").argument(Argument::new("text", types::string()).optional()))
        .unwrap();
    manager
}

#[test]
fn test_round_trip_through_input_string() {
    let syntax = Syntax::default();
    for line in ["[a, b, [c, d]]", "{k=v, n=[1, 2]}", "plain", "[]", "{}"] {
        let first = tokenize(line, &syntax).remove(0).unwrap();
        let again = tokenize(&first.to_input_string(), &syntax).remove(0).unwrap();
        assert_eq!(first, again, "round trip of {line}");
    }
}

#[test]
fn test_map_failure_is_local_to_map() {
    let syntax = Syntax::default();
    match tokenize("{a=}", &syntax).remove(0) {
        Err(InputParseFail::NextElementNotFound { root, .. }) => {
            assert!(matches!(root, Input::Map { .. }));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_copy_with_sources_and_target() {
    let manager = file_manager();
    let result = manager.parse("file cp -r [a.txt, b.txt] dir/").unwrap();
    assert_eq!(result.len(), 1);
    let copy = &result[0];
    assert_eq!(copy.command.path(), &["file", "copy"]);
    assert_eq!(copy.get("recursive"), Some(&Value::Bool(true)));
    assert_eq!(
        copy.get("sources"),
        Some(&Value::List(vec![Value::str("a.txt"), Value::str("b.txt")]))
    );
    assert_eq!(copy.get("target"), Some(&Value::str("dir/")));

    // a bare list takes every following string
    match manager.parse("file copy a.txt b.txt").unwrap_err() {
        ParseFail::ArgumentsMissing { missing, .. } => assert_eq!(missing[0].name(), "target"),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_boolean_flag_at_end_of_line() {
    let manager = file_manager();
    let result = manager.parse("file rm --recursive").unwrap();
    assert_eq!(result[0].get("recursive"), Some(&Value::Bool(true)));
}

#[test]
fn test_missing_required_names_argument() {
    let manager = file_manager();
    match manager.parse("file rm").unwrap_err() {
        ParseFail::ArgumentsMissing { missing, command, .. } => {
            assert_eq!(command.full_name(), "file remove");
            assert_eq!(missing.iter().map(|a| a.name()).collect::<Vec<_>>(), vec!["recursive"]);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_chain_across_trees() {
    let manager = file_manager();
    let result = manager.parse("file rm -r true & echo done & echo").unwrap();
    let names: Vec<String> = result.iter().map(|c| c.command.full_name()).collect();
    assert_eq!(names, vec!["file remove", "echo", "echo"]);
    assert_eq!(result[1].get("text"), Some(&Value::str("done")));
    assert!(result[2].get("text").is_none());
}

#[test]
fn test_failure_carries_partial_state() {
    let manager = file_manager();
    let fail = manager.parse("echo hi & ehco there").unwrap_err();
    match &fail {
        ParseFail::CommandNotFound { suggestions, state, .. } => {
            assert_eq!(suggestions, &vec!["echo".to_string()]);
            assert_eq!(state.commands.len(), 1);
            assert_eq!(state.position, 3);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(fail.to_string().contains("ehco"));
}

#[test]
fn test_definitions_drive_parser() {
    let spec = DefinitionSpec::from_yaml(
        r#"
commands:
  - name: deploy
    arguments:
      env:
        type: choice(staging|production)
      -t|--tags:
        type: map<string,string>
        optional: true
      --replicas:
        type: int
        default: 1
"#,
    )
    .unwrap();
    let mut manager = CommandManager::new();
    spec.register(&mut manager, &TypeRegistry::default()).unwrap();

    let result = manager.parse("deploy production --tags {team=core, tier=web}").unwrap();
    assert_eq!(result[0].get("env"), Some(&Value::str("production")));
    assert_eq!(result[0].get("replicas"), Some(&Value::Int(1)));
    assert_eq!(
        result[0].get("tags").and_then(|t| t.get("tier")),
        Some(&Value::str("web"))
    );

    match manager.parse("deploy qa").unwrap_err() {
        ParseFail::InvalidInputForArgument { validation, .. } => assert_eq!(validation.len(), 1),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_concurrent_parses_share_tree() {
    let manager = Arc::new(file_manager());
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let manager = Arc::clone(&manager);
            thread::spawn(move || {
                let line = format!("echo message-{i}");
                let result = manager.parse(&line).unwrap();
                result[0].get("text").and_then(|v| v.as_str()).map(str::to_string)
            })
        })
        .collect();
    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap(), Some(format!("message-{i}")));
    }
}
