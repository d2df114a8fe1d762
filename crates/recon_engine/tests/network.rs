mod common;

use common::{request, response};
use recon_engine::NetworkObserver;

const PAGE: &str = "https://intel.example.com/dashboard";

#[test]
fn request_filter_keeps_matching_urls() {
    let observer = NetworkObserver::bounded(16);
    let tap = observer.tap();
    tap.emit(request("https://intel.example.com/api/v1/series"));
    tap.emit(request("https://intel.example.com/static/app.css"));
    tap.emit(request("https://cdn.example.com/shrimp-forecast.json"));
    tap.emit(request("https://intel.example.com/img/logo.png"));

    let traffic = observer.drain(PAGE);

    let urls: Vec<&str> = traffic.requests.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://intel.example.com/api/v1/series",
            "https://cdn.example.com/shrimp-forecast.json",
        ]
    );
    assert!(traffic.requests.iter().all(|r| r.page_url == PAGE));
}

#[test]
fn response_filter_requires_ok_status_and_api_like_url() {
    let observer = NetworkObserver::bounded(16);
    let tap = observer.tap();
    tap.emit(response("https://intel.example.com/api/prices", 200));
    tap.emit(response("https://intel.example.com/api/prices", 204));
    tap.emit(response("https://intel.example.com/data/export.csv", 200));
    tap.emit(response("https://intel.example.com/forecast", 200));
    tap.emit(response("https://intel.example.com/api/secure", 401));

    let traffic = observer.drain(PAGE);

    let kept: Vec<(&str, u16)> = traffic
        .api_responses
        .iter()
        .map(|r| (r.url.as_str(), r.status))
        .collect();
    assert_eq!(
        kept,
        vec![
            ("https://intel.example.com/api/prices", 200),
            ("https://intel.example.com/data/export.csv", 200),
        ]
    );
}

#[test]
fn url_matching_is_case_sensitive() {
    let event = request("https://intel.example.com/API/Prices");
    assert!(!event.is_retained());
}

#[test]
fn overflow_is_counted_not_blocking() {
    let observer = NetworkObserver::bounded(2);
    let tap = observer.tap();
    for i in 0..5 {
        tap.emit(request(&format!("https://intel.example.com/api/{i}")));
    }
    // irrelevant events are filtered before they take capacity
    tap.emit(request("https://intel.example.com/style.css"));

    let traffic = observer.drain(PAGE);

    assert_eq!(traffic.requests.len(), 2);
    assert_eq!(traffic.dropped, 3);
    assert_eq!(traffic.requests[0].url, "https://intel.example.com/api/0");
}

#[test]
fn events_after_drain_go_nowhere() {
    let observer = NetworkObserver::bounded(4);
    let tap = observer.tap();
    let traffic = observer.drain(PAGE);
    assert!(traffic.requests.is_empty());

    // receiver is gone; emitting is a no-op
    tap.emit(request("https://intel.example.com/api/late"));
}
