use std::sync::mpsc;

use batch_pdf_downloader::clients::HttpClient;
use batch_pdf_downloader::models::TaskStatus;
use batch_pdf_downloader::orchestrator::{StatusTracker, UiEvent};
use batch_pdf_downloader::services::{ResourceClassifier, ResourceKind};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn classifier() -> ResourceClassifier {
    ResourceClassifier::new(HttpClient::new().expect("创建 HTTP 会话失败"))
}

#[tokio::test]
async fn test_pdf_extension_is_classified_without_probe() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (tx, rx) = mpsc::channel();
    let tracker = StatusTracker::new(tx).for_task(1);

    for url in ["/docs/report.pdf", "/docs/REPORT.PDF", "/a/b/Paper.Pdf"] {
        let kind = classifier()
            .classify(&format!("{}{}", server.uri(), url), Some(&tracker))
            .await;
        assert_eq!(kind, ResourceKind::DirectPdf, "{}", url);
    }

    // 没有探测就不应上报 Probing
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_probe_with_pdf_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/download"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "application/pdf"))
        .expect(1)
        .mount(&server)
        .await;

    let (tx, rx) = mpsc::channel();
    let tracker = StatusTracker::new(tx).for_task(3);

    let kind = classifier()
        .classify(&format!("{}/download", server.uri()), Some(&tracker))
        .await;

    assert_eq!(kind, ResourceKind::DirectPdf);
    match rx.try_recv().unwrap() {
        UiEvent::Task(update) => {
            assert_eq!(update.ordinal, 3);
            assert_eq!(update.status, Some(TaskStatus::Probing));
        }
        other => panic!("意外的事件: {:?}", other),
    }
}

#[tokio::test]
async fn test_html_and_error_responses_are_rendered() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/article"))
        .respond_with(
            ResponseTemplate::new(200).insert_header("content-type", "text/html; charset=utf-8"),
        )
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).insert_header("content-type", "application/pdf"))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/untyped"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let classifier = classifier();
    for url in ["/article", "/missing", "/untyped"] {
        let kind = classifier
            .classify(&format!("{}{}", server.uri(), url), None)
            .await;
        assert_eq!(kind, ResourceKind::Rendered, "{}", url);
    }
}

#[tokio::test]
async fn test_unreachable_host_degrades_to_rendered() {
    // 端口 1 上没有服务，连接会被拒绝
    let kind = classifier()
        .classify("http://127.0.0.1:1/article", None)
        .await;
    assert_eq!(kind, ResourceKind::Rendered);
}
