//! End-to-end array key completion over the LSP surface.

mod common;

use common::{complete, create_test_backend, labels, open};
use deepkeys_lsp::Backend;
use deepkeys_lsp::settings::Settings;
use tower_lsp::LanguageServer;
use tower_lsp::lsp_types::*;

#[tokio::test]
async fn offers_literal_array_keys_with_previews() {
    let backend = create_test_backend();
    let uri = Url::parse("file:///basic.php").unwrap();
    let text = concat!(
        "<?php\n",
        "$config = ['host' => 'localhost', 'port' => 3306];\n",
        "echo $config[''];\n",
    );
    open(&backend, &uri, text).await;

    let items = complete(&backend, &uri, 2, 14).await;
    assert_eq!(labels(&items), ["host", "port"]);

    let host = &items[0];
    assert_eq!(host.detail.as_deref(), Some("host = 'localhost'"));
    assert_eq!(host.kind, Some(CompletionItemKind::FIELD));
    assert_eq!(host.sort_text.as_deref(), Some("0000"));
    assert_eq!(items[1].detail.as_deref(), Some("port = 3306"));
    assert_eq!(items[1].sort_text.as_deref(), Some("0001"));
}

#[tokio::test]
async fn completes_while_the_access_is_still_unclosed() {
    let backend = create_test_backend();
    let uri = Url::parse("file:///typing.php").unwrap();
    let text = concat!(
        "<?php\n",
        "$user = ['name' => 'Ada', 'age' => 36];\n",
        "$user['",
    );
    open(&backend, &uri, text).await;

    let items = complete(&backend, &uri, 2, 7).await;
    assert_eq!(labels(&items), ["name", "age"]);

    // Accepting a completion closes the access.
    let Some(CompletionTextEdit::Edit(edit)) = &items[0].text_edit else {
        panic!("expected a plain text edit");
    };
    assert_eq!(edit.new_text, "name']");
}

#[tokio::test]
async fn filters_by_the_typed_partial_key() {
    let backend = create_test_backend();
    let uri = Url::parse("file:///partial.php").unwrap();
    let text = concat!(
        "<?php\n",
        "$user = ['name' => 'Ada', 'age' => 36];\n",
        "$user['na",
    );
    open(&backend, &uri, text).await;

    let items = complete(&backend, &uri, 2, 9).await;
    assert_eq!(labels(&items), ["name"]);
}

#[tokio::test]
async fn walks_chained_prefix_keys_into_nested_shapes() {
    let backend = create_test_backend();
    let uri = Url::parse("file:///nested.php").unwrap();
    let text = concat!(
        "<?php\n",
        "$response = ['meta' => ['page' => 1, 'total' => 10], 'data' => []];\n",
        "$response['meta']['",
    );
    open(&backend, &uri, text).await;

    let items = complete(&backend, &uri, 2, 19).await;
    assert_eq!(labels(&items), ["page", "total"]);
}

#[tokio::test]
async fn offers_keys_inferred_through_function_returns() {
    let backend = create_test_backend();
    let uri = Url::parse("file:///func.php").unwrap();
    let text = concat!(
        "<?php\n",
        "function settings() {\n",
        "    return ['theme' => 'dark', 'lang' => 'en'];\n",
        "}\n",
        "$s = settings();\n",
        "echo $s[''];\n",
    );
    open(&backend, &uri, text).await;

    let items = complete(&backend, &uri, 5, 9).await;
    assert_eq!(labels(&items), ["theme", "lang"]);
}

#[tokio::test]
async fn surfaces_harvested_comments_as_documentation() {
    let backend = create_test_backend();
    let uri = Url::parse("file:///docs.php").unwrap();
    let text = concat!(
        "<?php\n",
        "$cfg = [\n",
        "    // database host name\n",
        "    'host' => 'localhost',\n",
        "    'port' => 3306,\n",
        "];\n",
        "echo $cfg[''];\n",
    );
    open(&backend, &uri, text).await;

    let items = complete(&backend, &uri, 6, 11).await;
    assert_eq!(labels(&items), ["host", "port"]);
    match &items[0].documentation {
        Some(Documentation::String(text)) => assert_eq!(text, "database host name"),
        other => panic!("expected string documentation, got {other:?}"),
    }
    assert!(items[1].documentation.is_none());
}

#[tokio::test]
async fn stays_quiet_outside_array_key_contexts() {
    let backend = create_test_backend();
    let uri = Url::parse("file:///quiet.php").unwrap();
    let text = concat!("<?php\n", "$config = ['host' => 1];\n", "echo $config;\n");
    open(&backend, &uri, text).await;

    let items = complete(&backend, &uri, 2, 12).await;
    assert!(items.is_empty());
}

#[tokio::test]
async fn sql_row_keys_complete_with_a_configured_schema() {
    let mut settings = Settings::default();
    settings.schema.insert(
        "users".to_string(),
        vec!["id".to_string(), "name".to_string(), "email".to_string()],
    );
    let backend = Backend::new_test_with_settings(settings);
    let uri = Url::parse("file:///sql.php").unwrap();
    let text = concat!(
        "<?php\n",
        "$pdo = new PDO('sqlite::memory:');\n",
        "$stmt = $pdo->query('SELECT * FROM users');\n",
        "$row = $stmt->fetch();\n",
        "echo $row[''];\n",
    );
    open(&backend, &uri, text).await;

    let items = complete(&backend, &uri, 4, 11).await;
    assert_eq!(labels(&items), ["id", "name", "email"]);
}

#[tokio::test]
async fn trigger_character_requests_run_on_the_background_profile() {
    let backend = create_test_backend();
    let uri = Url::parse("file:///bg.php").unwrap();
    let text = concat!(
        "<?php\n",
        "$config = ['host' => 'localhost'];\n",
        "echo $config[''];\n",
    );
    open(&backend, &uri, text).await;

    let result = backend
        .completion(CompletionParams {
            text_document_position: TextDocumentPositionParams {
                text_document: TextDocumentIdentifier { uri: uri.clone() },
                position: Position {
                    line: 2,
                    character: 14,
                },
            },
            work_done_progress_params: WorkDoneProgressParams::default(),
            partial_result_params: PartialResultParams::default(),
            context: Some(CompletionContext {
                trigger_kind: CompletionTriggerKind::TRIGGER_CHARACTER,
                trigger_character: Some("'".to_string()),
            }),
        })
        .await
        .unwrap();

    let Some(CompletionResponse::Array(items)) = result else {
        panic!("expected completion items");
    };
    assert_eq!(labels(&items), ["host"]);
}
