//! Rules served by the `mockgate` binary unless started with `--no-demo`.

use crate::context::Context;
use crate::error::Result;
use crate::matcher::{all_of, any_of, body, header, method, not, path, request};
use crate::rule::{respond_with, MockRule};
use serde_json::{json, Value};

/// The context as a JSON object with `key` set to `value`.
fn ctx_with(ctx: &Context, key: &str, value: Value) -> Value {
    let mut out = ctx.to_json();
    out[key] = value;
    out
}

/// Demo rules, in dispatch order.
///
/// | # | matches                                              | responds with             |
/// |---|------------------------------------------------------|---------------------------|
/// | 0 | `/api/with-url/:extra`                               | ctx + `extra: "yes"`      |
/// | 1 | `GET /api/dual`                                      | ctx + `dual: true`        |
/// | 2 | `GET` + `accept: text/xml`, or `POST /api/merchant/:merchantId` with `status: "open"` | `contentType` |
/// | 3 | `GET` or `/api/dual`                                 | ctx + `verb: "get"`       |
/// | 4 | anything but `POST`                                  | `{"not": "post"}`         |
pub fn demo_rules() -> Result<Vec<MockRule>> {
    Ok(vec![
        MockRule::new(
            path("/api/with-url/:extra")?,
            respond_with(|_req, ctx| ctx_with(ctx, "extra", json!("yes"))),
        ),
        MockRule::new(
            request("get", "/api/dual")?,
            respond_with(|_req, ctx| ctx_with(ctx, "dual", json!(true))),
        ),
        MockRule::new(
            any_of(vec![
                all_of(vec![
                    method("get"),
                    body(|_| true),
                    header("accept", "text/xml")?,
                ]),
                all_of(vec![
                    method("post"),
                    path("/api/merchant/:merchantId")?,
                    body(|b| b["status"] == "open"),
                ]),
            ]),
            respond_with(|_req, ctx| {
                json!({
                    "contentType": ctx.lookup_str("headers.accept"),
                    "merchantId": ctx.lookup_str("params.merchantId"),
                })
            }),
        ),
        MockRule::new(
            any_of(vec![method("get"), path("/api/dual")?]),
            respond_with(|_req, ctx| ctx_with(ctx, "verb", json!("get"))),
        ),
        MockRule::new(
            not(method("post")),
            respond_with(|_req, _ctx| json!({"not": "post"})),
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::{Dispatch, Dispatcher};
    use crate::request::MockRequest;
    use hyper::Method;

    async fn dispatch(request: MockRequest) -> Dispatch {
        Dispatcher::new(demo_rules().unwrap())
            .dispatch(&request)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_with_url_rule() {
        assert_eq!(
            dispatch(MockRequest::new(Method::DELETE, "/api/with-url/abc")).await,
            Dispatch::Mock {
                rule: 0,
                response: json!({
                    "path": "/api/with-url/abc",
                    "params": {"extra": "abc"},
                    "extra": "yes"
                })
            }
        );
    }

    #[tokio::test]
    async fn test_dual_rule() {
        assert_eq!(
            dispatch(MockRequest::new(Method::GET, "/api/dual")).await,
            Dispatch::Mock {
                rule: 1,
                response: json!({
                    "method": "GET",
                    "path": "/api/dual",
                    "params": {},
                    "dual": true
                })
            }
        );
    }

    #[tokio::test]
    async fn test_merchant_rule_both_branches() {
        let xml = MockRequest::new(Method::GET, "/feed").with_header("accept", "text/xml");
        assert_eq!(
            dispatch(xml).await,
            Dispatch::Mock {
                rule: 2,
                response: json!({"contentType": "text/xml", "merchantId": null})
            }
        );

        let open = MockRequest::new(Method::POST, "/api/merchant/m-1")
            .with_json(json!({"status": "open"}));
        assert_eq!(
            dispatch(open).await,
            Dispatch::Mock {
                rule: 2,
                response: json!({"contentType": null, "merchantId": "m-1"})
            }
        );
    }

    #[tokio::test]
    async fn test_post_not_covered_falls_through() {
        let closed = MockRequest::new(Method::POST, "/api/merchant/m-1")
            .with_json(json!({"status": "closed"}));
        assert_eq!(dispatch(closed).await, Dispatch::Passthrough);
    }

    #[tokio::test]
    async fn test_not_post_rule() {
        assert_eq!(
            dispatch(MockRequest::new(Method::PUT, "/anything")).await,
            Dispatch::Mock {
                rule: 4,
                response: json!({"not": "post"})
            }
        );
    }

    #[tokio::test]
    async fn test_plain_get_hits_any_of_rule() {
        match dispatch(MockRequest::new(Method::GET, "/home")).await {
            Dispatch::Mock { rule, response } => {
                assert_eq!(rule, 3);
                assert_eq!(response["verb"], "get");
                assert_eq!(response["method"], "GET");
            }
            other => panic!("expected mock, got {other:?}"),
        }
    }
}
