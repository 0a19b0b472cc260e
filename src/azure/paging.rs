//! Materializing paged collections.

use serde_json::Value;
use tracing::{trace, warn};

use super::client::{ArmClient, ArmRequest};
use super::error::ArmError;

/// Upper bound on pages followed for one listing.
const MAX_PAGES: usize = 1000;

/// Follow `nextLink` until it runs out and concatenate every `value` array.
///
/// A response without `value` that is itself an array is taken as a single
/// page; anything else contributes nothing.
pub async fn paged_object_to_list(
    client: &dyn ArmClient,
    request: ArmRequest,
) -> Result<Vec<Value>, ArmError> {
    collect_pages(client, request, MAX_PAGES).await
}

async fn collect_pages(
    client: &dyn ArmClient,
    request: ArmRequest,
    max_pages: usize,
) -> Result<Vec<Value>, ArmError> {
    let path = request.path.clone();
    let mut items = Vec::new();
    let mut next = Some(request);
    let mut pages = 0;

    while let Some(request) = next.take() {
        let template = request.clone();
        let response = client.send(request).await?;
        pages += 1;

        match response.body {
            Value::Object(mut page) => {
                if let Some(Value::Array(values)) = page.remove("value") {
                    items.extend(values);
                }
                match page.remove("nextLink") {
                    Some(Value::String(link)) if !link.is_empty() && pages < max_pages => {
                        trace!(%link, "following next page");
                        next = Some(ArmRequest {
                            path: link,
                            query: Vec::new(),
                            body: None,
                            ..template
                        });
                    }
                    Some(Value::String(link)) if !link.is_empty() => {
                        warn!(
                            %path,
                            pages,
                            items = items.len(),
                            "listing truncated at the page limit, remaining pages were not fetched"
                        );
                    }
                    _ => {}
                }
            }
            Value::Array(values) => items.extend(values),
            _ => {}
        }
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::azure::memory::MemoryClient;
    use serde_json::json;

    #[tokio::test]
    async fn test_follows_next_links() {
        let client = MemoryClient::new("sub");
        client.respond(
            crate::azure::Method::Get,
            "/subscriptions/sub/providers/Microsoft.Network/virtualNetworks",
            json!({
                "value": [{"name": "a"}],
                "nextLink": "https://management.azure.com/page2"
            }),
        );
        client.respond(
            crate::azure::Method::Get,
            "https://management.azure.com/page2",
            json!({"value": [{"name": "b"}, {"name": "c"}]}),
        );

        let items = paged_object_to_list(
            &client,
            ArmRequest::get(
                "/subscriptions/sub/providers/Microsoft.Network/virtualNetworks",
                "2023-09-01",
            ),
        )
        .await
        .unwrap();

        let names: Vec<_> = items.iter().map(|v| v["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(client.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_stops_at_page_limit() {
        let client = MemoryClient::new("sub");
        let link = "https://management.azure.com/endless";
        client.respond(
            crate::azure::Method::Get,
            "/subscriptions/sub/resourcegroups",
            json!({"value": [{"name": "a"}], "nextLink": link}),
        );
        client.respond(
            crate::azure::Method::Get,
            link,
            json!({"value": [{"name": "b"}], "nextLink": link}),
        );

        let items = collect_pages(
            &client,
            ArmRequest::get("/subscriptions/sub/resourcegroups", "2022-09-01"),
            3,
        )
        .await
        .unwrap();

        assert_eq!(items.len(), 3);
        assert_eq!(client.requests().len(), 3);
    }
}
