use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use pokemon_research_lab::aggregation::{
    aggregate, AggregationOptions, AggregationOutcome, Aggregator, CancelToken, DetailPayload, ItemRef, ListingPage,
    Transport, TransportError,
};
use pokemon_research_lab::store::Store;
use pokemon_research_lab::types::{Provenance, Row, Value};

#[derive(Default)]
struct Mock {
    total: usize,
    events: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    /// Cancel the given token and then hang when this id is fetched.
    hang_on: Option<(i64, CancelToken)>,
}

impl Mock {
    fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for Mock {
    fn describe(&self) -> String {
        "mock".to_string()
    }

    async fn fetch_listing(&self, offset: usize, limit: usize) -> Result<ListingPage, TransportError> {
        self.events.lock().unwrap().push(format!("list {offset}"));
        let results = (offset..(offset + limit).min(self.total))
            .map(|i| ItemRef {
                name: format!("mon-{}", i + 1),
                url: format!("https://example.test/pokemon/{}/", i + 1),
            })
            .collect();
        Ok(ListingPage {
            count: self.total,
            next: None,
            previous: None,
            results,
        })
    }

    async fn fetch_detail(&self, item: &ItemRef, _cancel: &CancelToken) -> Result<DetailPayload, TransportError> {
        let id: i64 = item.name.trim_start_matches("mon-").parse().unwrap();
        self.events.lock().unwrap().push(format!("detail {id}"));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some((hang_id, token)) = &self.hang_on {
            if *hang_id == id {
                token.cancel();
                std::future::pending::<()>().await;
            }
        }
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        Ok(serde_json::from_value(serde_json::json!({
            "id": id,
            "name": item.name,
            "sprites": {"front_default": format!("https://img.test/{id}.png")},
            "types": [{"type": {"name": "water"}}],
            "stats": [
                {"base_stat": 40, "stat": {"name": "hp"}},
                {"base_stat": 70, "stat": {"name": "speed"}}
            ],
            "abilities": [{"ability": {"name": "torrent"}}]
        }))
        .unwrap())
    }
}

fn options(page_limit: usize, concurrency: usize) -> AggregationOptions {
    AggregationOptions {
        page_limit,
        concurrency,
        ..AggregationOptions::default()
    }
}

#[tokio::test]
async fn listing_is_fully_discovered_before_details() {
    let mock = Mock::new(3);
    let agg = Aggregator::new(mock, options(2, 15));
    let mut store = Store::new();

    agg.run(&mut store, &CancelToken::new()).await.unwrap();

    let events = agg.transport().events();
    assert_eq!(&events[..2], ["list 0", "list 2"]);
    assert_eq!(events.len(), 5);
    assert!(events[2..].iter().all(|e| e.starts_with("detail")));
    assert_eq!(store.row_ids(), &[1, 2, 3]);
}

#[tokio::test]
async fn details_are_normalized_into_rows() {
    let mut store = Store::new();
    let outcome = aggregate(&mut store, Mock::new(2), options(200, 15), &CancelToken::new())
        .await
        .unwrap();

    assert!(matches!(outcome, AggregationOutcome::Completed(s) if s.rows == 2));
    assert_eq!(store.provenance(), Provenance::Remote);
    let row = store.row(2).unwrap();
    assert_eq!(row.get("name"), Some(Value::text("mon-2")));
    assert_eq!(row.get("types"), Some(Value::text("water")));
    assert_eq!(row.get("sprite"), Some(Value::text("https://img.test/2.png")));
    assert_eq!(row.get("hp"), Some(Value::Number(40.0)));
    assert_eq!(row.get("attack"), Some(Value::Number(0.0)));
    assert_eq!(row.get("speed"), Some(Value::Number(70.0)));
    assert_eq!(row.get("ability"), Some(Value::text("torrent")));
}

#[tokio::test]
async fn never_exceeds_concurrency_cap() {
    let agg = Aggregator::new(Mock::new(10), options(200, 4));
    agg.run(&mut Store::new(), &CancelToken::new()).await.unwrap();

    assert_eq!(agg.transport().max_in_flight.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn in_flight_batch_is_abandoned_on_cancel() {
    let token = CancelToken::new();
    let mut mock = Mock::new(9);
    mock.hang_on = Some((5, token.clone()));
    let agg = Aggregator::new(mock, options(200, 3));

    let mut store = Store::new();
    store.replace_rows([Row::with_base_defaults(1000)], Provenance::Csv);

    let outcome = tokio::time::timeout(std::time::Duration::from_secs(5), agg.run(&mut store, &token))
        .await
        .expect("cancelled run returns promptly")
        .unwrap();

    match outcome {
        AggregationOutcome::Cancelled(progress) => {
            assert_eq!(progress.rows, 3);
            assert_eq!(progress.total, Some(9));
        }
        other => panic!("expected cancellation, got {other:?}"),
    }
    assert_eq!(store.row_ids(), &[1000]);
    assert_eq!(store.provenance(), Provenance::Csv);
    assert!(!agg.transport().events().contains(&"detail 7".to_string()));
}

#[tokio::test]
async fn empty_listing_commits_an_empty_row_set() {
    let mut store = Store::new();
    store.replace_rows([Row::with_base_defaults(1)], Provenance::Csv);

    let outcome = aggregate(&mut store, Mock::new(0), options(200, 15), &CancelToken::new())
        .await
        .unwrap();

    assert!(matches!(outcome, AggregationOutcome::Completed(s) if s.rows == 0));
    assert!(store.is_empty());
    assert_eq!(store.provenance(), Provenance::Remote);
}
