//! Authentication expressions resolved against a live mock server.

use assert2::{check, let_assert};
use courier::{
    AuthExpression, Client, Error,
    auth::{BasicAuth, BearerAuth, HeaderAuth, QueryAuth},
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{any, header, method, path, query_param},
};

fn either_key() -> AuthExpression {
    AuthExpression::or([
        AuthExpression::single("api_key"),
        AuthExpression::single("api_query"),
    ])
}

#[tokio::test]
async fn test_or_uses_first_valid_credential() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/store/inventory"))
        .and(query_param("api_key", "from-query"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::builder(mock_server.uri())
        .credential("api_key", HeaderAuth::new("X-API-Key", ""))
        .credential("api_query", QueryAuth::new("api_key", "from-query"))
        .build();

    let response = client
        .get("/store/inventory")
        .authenticate(either_key())
        .send()
        .await
        .expect("response");
    check!(response.is_success());

    let requests = mock_server.received_requests().await.expect("recorded");
    let_assert!([request] = requests.as_slice());
    check!(request.headers.get("x-api-key").is_none());
}

#[tokio::test]
async fn test_or_prefers_earlier_alternative() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(header("X-API-Key", "from-header"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::builder(mock_server.uri())
        .credential("api_key", HeaderAuth::new("X-API-Key", "from-header"))
        .credential("api_query", QueryAuth::new("api_key", "from-query"))
        .build();

    client
        .get("/store/inventory")
        .authenticate(either_key())
        .send()
        .await
        .expect("response");

    let requests = mock_server.received_requests().await.expect("recorded");
    let_assert!([request] = requests.as_slice());
    check!(request.url.query().is_none());
}

#[tokio::test]
async fn test_and_applies_every_credential() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/pet/3"))
        .and(header("Authorization", "Bearer t0k3n"))
        .and(query_param("api_key", "k"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::builder(mock_server.uri())
        .credential("bearer", BearerAuth::new("t0k3n"))
        .credential("api_query", QueryAuth::new("api_key", "k"))
        .build();

    let response = client
        .delete("/pet/%s")
        .template_params(["3"])
        .authenticate(AuthExpression::and([
            AuthExpression::single("bearer"),
            AuthExpression::single("api_query"),
        ]))
        .send()
        .await
        .expect("response");

    check!(response.status() == 204);
}

#[tokio::test]
async fn test_and_failure_makes_no_request() {
    let mock_server = MockServer::start().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = Client::builder(mock_server.uri())
        .credential("basic", BasicAuth::new("", "secret"))
        .credential("bearer", BearerAuth::new(" "))
        .build();

    let err = client
        .get("/user/login")
        .authenticate(AuthExpression::and([
            AuthExpression::single("basic"),
            AuthExpression::single("bearer"),
        ]))
        .send()
        .await
        .expect_err("credentials missing");

    let_assert!(Error::Authentication(message) = err);
    check!(message == "  basic auth username value is empty!\n  bearer token value is empty!");
}

#[tokio::test]
async fn test_undefined_credential_makes_no_request() {
    let mock_server = MockServer::start().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = Client::new(mock_server.uri());

    let err = client
        .get("/store/inventory")
        .authenticate(either_key())
        .send()
        .await
        .expect_err("nothing registered");

    insta::assert_snapshot!(either_key().to_string(), @"(api_key or api_query)");
    check!(err.is_authentication());
    check!(err.to_string().contains("api_key is undefined!"));
    check!(err.to_string().contains("api_query is undefined!"));
}
