/// Integration tests for OpenAI API compatibility
///
/// A real server is bound on an ephemeral port and called over HTTP, both
/// with plain reqwest and with the async-openai client, so the canonical
/// response is proven to deserialize in a real OpenAI client.
///
/// The generation tool is stood in for by small `sh` scripts.
use async_openai::{
    config::OpenAIConfig,
    types::{ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs},
    Client,
};
use codex_bridge::{BridgeConfig, BridgeManager, Result, ToolCommand};
use serde_json::{json, Value};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::time::Duration;

fn config(chat_script: &str, version_script: &str) -> BridgeConfig {
    BridgeConfig {
        tool: ToolCommand {
            program: "sh".to_string(),
            chat_args: vec!["-c".into(), chat_script.to_string()],
            version_args: vec!["-c".into(), version_script.to_string()],
        },
        invoke_timeout: Duration::from_secs(10),
        ..BridgeConfig::default()
    }
}

/// Starts the bridge on 127.0.0.1:0 and returns its address. The server
/// runs until the test's runtime shuts down.
async fn spawn_bridge(config: BridgeConfig) -> Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let manager = BridgeManager::new(config);

    tokio::spawn(async move { manager.serve_listener(listener, std::future::pending()).await });

    // serve_listener probes before accepting; wait for /health
    let client = reqwest::Client::new();
    for _ in 0..100 {
        if client.get(format!("http://{}/health", addr)).send().await.is_ok() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    Ok(addr)
}

fn openai_client(addr: SocketAddr) -> Client<OpenAIConfig> {
    let config = OpenAIConfig::new()
        .with_api_base(format!("http://{}/v1", addr))
        .with_api_key("dummy-key"); // keys are not checked
    Client::with_config(config)
}

fn user_request(content: &str) -> Result<async_openai::types::CreateChatCompletionRequest> {
    Ok(CreateChatCompletionRequestArgs::default()
        .model("codex-cli")
        .messages(vec![ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessageArgs::default().content(content).build()?,
        )])
        .build()?)
}

#[cfg(unix)]
#[tokio::test]
async fn test_openai_client_gets_tool_answer() -> Result<()> {
    let addr = spawn_bridge(config(
        r#"cat >/dev/null; echo '{"choices":[{"message":{"content":"4"}}],"usage":{"prompt_tokens":5,"completion_tokens":1,"total_tokens":6}}'"#,
        "echo codex 1.0.0",
    ))
    .await?;

    let response = openai_client(addr).chat().create(user_request("What is 2+2?")?).await?;
    assert_eq!(response.choices.len(), 1);
    assert_eq!(response.choices[0].message.content.as_deref(), Some("4"));
    assert_eq!(response.model, "codex-cli");
    assert_eq!(response.usage.map(|u| u.total_tokens), Some(6));

    let status: Value = reqwest::get(format!("http://{}/status", addr)).await?.json().await?;
    assert_eq!(status["available"], true);
    assert_eq!(status["version"], "codex 1.0.0");

    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn test_openai_client_gets_simulated_answer_when_tool_missing() -> Result<()> {
    let addr = spawn_bridge(config("echo unreachable", "exit 127")).await?;

    let response = openai_client(addr).chat().create(user_request("hi")?).await?;
    let content = response.choices[0].message.content.clone().unwrap_or_default();
    assert!(content.contains("SIMULATED"));
    assert!(content.contains("user: hi"));

    let models = openai_client(addr).models().list().await?;
    assert_eq!(models.data.len(), 1);
    assert_eq!(models.data[0].id, "codex-cli");

    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn test_openai_client_streams() -> Result<()> {
    use futures::StreamExt;

    let addr = spawn_bridge(config("cat >/dev/null; echo streamed answer", "echo codex 1.0.0")).await?;

    let mut request = user_request("Count to 3")?;
    request.stream = Some(true);
    let mut stream = openai_client(addr).chat().create_stream(request).await?;

    let mut full_response = String::new();
    while let Some(result) = stream.next().await {
        for choice in result?.choices {
            if let Some(content) = choice.delta.content {
                full_response.push_str(&content);
            }
        }
    }
    assert_eq!(full_response, "streamed answer");

    Ok(())
}

#[tokio::test]
async fn test_health_and_bad_requests() -> Result<()> {
    let addr = spawn_bridge(config("exit 1", "exit 1")).await?;
    let client = reqwest::Client::new();

    let health = client.get(format!("http://{}/health", addr)).send().await?;
    assert_eq!(health.status(), 200);
    assert_eq!(health.json::<Value>().await?, json!({"status": "ok"}));

    let missing = client
        .post(format!("http://{}/v1/chat/completions", addr))
        .json(&json!({}))
        .send()
        .await?;
    assert_eq!(missing.status(), 400);
    assert_eq!(missing.json::<Value>().await?, json!({"error": "Missing messages array"}));

    let empty = client
        .post(format!("http://{}/v1/chat/completions", addr))
        .json(&json!({"messages": []}))
        .send()
        .await?;
    assert_eq!(empty.status(), 400);
    assert_eq!(empty.json::<Value>().await?, json!({"error": "Empty messages array"}));

    Ok(())
}
