use digest_http::{Auth, HttpClient, HttpError, RequestOpts};
use reqwest::header::{HeaderName, HeaderValue};
use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> HttpClient {
    HttpClient::new(&format!("{}/", server.uri())).expect("client")
}

#[tokio::test]
async fn retries_server_errors_then_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let got: Value = client_for(&server)
        .get_json("items", RequestOpts::default())
        .await
        .expect("second attempt succeeds");
    assert_eq!(got, json!({"ok": true}));
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/send"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"error": {"message": "bad key"}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .post_json::<_, Value>("send", Some("sk-test"), &json!({}))
        .await
        .unwrap_err();
    match err {
        HttpError::Api { status, message, .. } => {
            assert_eq!(status.as_u16(), 401);
            assert_eq!(message, "bad key");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn sends_auth_query_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "sk-ant"))
        .and(header("x-extra", "1"))
        .and(query_param("beta", "true"))
        .and(body_json(json!({"hello": "world"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "m1"})))
        .mount(&server)
        .await;

    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert("x-extra", HeaderValue::from_static("1"));
    let opts = RequestOpts {
        auth: Some(Auth::Header {
            name: HeaderName::from_static("x-api-key"),
            value: HeaderValue::from_static("sk-ant"),
        }),
        headers: Some(headers),
        query: Some(vec![("beta", "true".into())]),
        ..Default::default()
    };
    let got: Value = client_for(&server)
        .post_json_opts("v1/messages", &json!({"hello": "world"}), opts)
        .await
        .unwrap();
    assert_eq!(got["id"], "m1");
}

#[tokio::test]
async fn undecodable_success_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .get_json::<Value>("anything", RequestOpts::default())
        .await
        .unwrap_err();
    assert!(matches!(err, HttpError::Decode(_, ref snip) if snip.contains("login")));
}
