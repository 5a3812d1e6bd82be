use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use mosaic_server::settings::Settings;
use mosaic_server::{AppState, app};
use rust_xlsxwriter::Workbook;
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "mosaic-test-boundary";

const SURVEY: &str = "Afstandsklasse,Totaal,Te voet,Fiets,OV,Auto (+overig)\n\
                      0-1 km,300,120,100,30,50\n\
                      1-5 km,100,10,40,20,30\n";

struct Harness {
    _dir: TempDir,
    router: Router,
    plot_dir: std::path::PathBuf,
}

fn harness() -> Harness {
    harness_with(Settings::default())
}

fn harness_with(base: Settings) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings {
        upload_dir: dir.path().join("uploads"),
        plot_dir: dir.path().join("static/plots"),
        ..base
    };
    let plot_dir = settings.plot_dir.clone();
    let state = Arc::new(AppState::new(settings).unwrap());
    Harness {
        _dir: dir,
        router: app(state),
        plot_dir,
    }
}

enum Part<'a> {
    File { name: &'a str, body: &'a [u8] },
    Text { field: &'a str, value: &'a str },
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::File { name, body: bytes } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"file\"; filename=\"{name}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
            Part::Text { field, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{field}\"\r\n\r\n{value}")
                        .as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

async fn post_upload(router: &Router, parts: &[Part<'_>]) -> Response {
    let request = Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap();
    router.clone().oneshot(request).await.unwrap()
}

async fn body_bytes(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

fn plot_count(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

fn assert_redirect_home(response: &Response) {
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/");
}

#[tokio::test]
async fn index_serves_the_upload_form() {
    let h = harness();
    let response = h
        .router
        .clone()
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(html.contains("enctype=\"multipart/form-data\""));
    assert!(html.contains("name=\"file\""));
}

#[tokio::test]
async fn health_reports_healthy() {
    let h = harness();
    let response = h
        .router
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn missing_file_redirects_to_form() {
    let h = harness();
    let response = post_upload(&h.router, &[Part::Text { field: "orientation", value: "x" }]).await;
    assert_redirect_home(&response);
    assert_eq!(plot_count(&h.plot_dir), 0);
}

#[tokio::test]
async fn empty_filename_redirects_to_form() {
    let h = harness();
    let response = post_upload(&h.router, &[Part::File { name: "", body: SURVEY.as_bytes() }]).await;
    assert_redirect_home(&response);
}

#[tokio::test]
async fn lock_file_redirects_to_form() {
    let h = harness();
    let response = post_upload(
        &h.router,
        &[Part::File { name: "~$survey.xlsx", body: b"lock" }],
    )
    .await;
    assert_redirect_home(&response);
    assert_eq!(plot_count(&h.plot_dir), 0);
}

#[tokio::test]
async fn non_multipart_post_redirects_to_form() {
    let h = harness();
    let request = Request::post("/upload")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from("hello"))
        .unwrap();
    let response = h.router.clone().oneshot(request).await.unwrap();
    assert_redirect_home(&response);
}

#[tokio::test]
async fn valid_sheet_returns_png_attachment() {
    let h = harness();
    let response = post_upload(
        &h.router,
        &[Part::File { name: "modal split.csv", body: SURVEY.as_bytes() }],
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"plot_modal_split.csv.png\""
    );
    let png = body_bytes(response).await;
    assert!(png.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]));

    let written: Vec<_> = std::fs::read_dir(&h.plot_dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(written.len(), 1);
    let name = written[0].file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("plot_") && name.ends_with(".png"));
    assert_eq!(std::fs::read(&written[0]).unwrap(), png);
}

fn survey_xlsx() -> Vec<u8> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    let head = ["Afstandsklasse", "Totaal", "Te voet", "Fiets", "OV", "Auto (+overig)"];
    for (col, name) in head.iter().enumerate() {
        sheet.write_string(0, col as u16, *name).unwrap();
    }
    let rows = [
        ("0-1 km", [300.0, 120.0, 100.0, 30.0, 50.0]),
        ("1-5 km", [100.0, 10.0, 40.0, 20.0, 30.0]),
    ];
    for (i, (name, values)) in rows.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_string(row, 0, *name).unwrap();
        for (col, v) in values.iter().enumerate() {
            sheet.write_number(row, col as u16 + 1, *v).unwrap();
        }
    }
    workbook.save_to_buffer().unwrap()
}

#[tokio::test]
async fn xlsx_upload_returns_png() {
    let h = harness();
    let xlsx = survey_xlsx();
    let response = post_upload(&h.router, &[Part::File { name: "modal split.xlsx", body: &xlsx }]).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"plot_modal_split.xlsx.png\""
    );
    let png = body_bytes(response).await;
    assert!(png.starts_with(b"\x89PNG"));
    assert_eq!(plot_count(&h.plot_dir), 1);

    // Same numbers as the csv survey, so the same chart.
    let csv = post_upload(&h.router, &[Part::File { name: "s.csv", body: SURVEY.as_bytes() }]).await;
    assert_eq!(body_bytes(csv).await, png);
}

#[tokio::test]
async fn oversized_upload_is_payload_too_large() {
    let h = harness_with(Settings {
        max_upload_bytes: 64,
        ..Settings::default()
    });
    let big = SURVEY.repeat(4);
    let response = post_upload(&h.router, &[Part::File { name: "s.csv", body: big.as_bytes() }]).await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(plot_count(&h.plot_dir), 0);
}

#[tokio::test]
async fn identical_uploads_give_identical_images() {
    let h = harness();
    let parts = [Part::File { name: "s.csv", body: SURVEY.as_bytes() }];
    let a = body_bytes(post_upload(&h.router, &parts).await).await;
    let b = body_bytes(post_upload(&h.router, &parts).await).await;
    assert!(!a.is_empty());
    assert_eq!(a, b);
    // Same filename twice still yields two distinct artifacts.
    assert_eq!(plot_count(&h.plot_dir), 2);
}

#[tokio::test]
async fn orientation_field_changes_the_image() {
    let h = harness();
    let x = post_upload(
        &h.router,
        &[
            Part::Text { field: "orientation", value: "x" },
            Part::File { name: "s.csv", body: SURVEY.as_bytes() },
        ],
    )
    .await;
    let y = post_upload(
        &h.router,
        &[
            Part::Text { field: "orientation", value: "y" },
            Part::File { name: "s.csv", body: SURVEY.as_bytes() },
        ],
    )
    .await;
    assert_eq!(x.status(), StatusCode::OK);
    assert_eq!(y.status(), StatusCode::OK);
    assert_ne!(body_bytes(x).await, body_bytes(y).await);
}

#[tokio::test]
async fn bad_orientation_is_rejected() {
    let h = harness();
    let response = post_upload(
        &h.router,
        &[
            Part::Text { field: "orientation", value: "diagonal" },
            Part::File { name: "s.csv", body: SURVEY.as_bytes() },
        ],
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn garbage_workbook_is_unprocessable_and_writes_no_plot() {
    let h = harness();
    let response = post_upload(
        &h.router,
        &[Part::File { name: "survey.xlsx", body: b"this is not a zip archive" }],
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert!(json["error"].as_str().is_some_and(|e| !e.is_empty()));
    assert_eq!(plot_count(&h.plot_dir), 0);
}

#[tokio::test]
async fn zero_totals_are_unprocessable() {
    let h = harness();
    let sheet = "Afstandsklasse,Totaal,Te voet,Fiets,OV,Auto (+overig)\n\
                 0-1 km,0,1,1,1,1\n";
    let response = post_upload(&h.router, &[Part::File { name: "s.csv", body: sheet.as_bytes() }]).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(plot_count(&h.plot_dir), 0);
}

#[tokio::test]
async fn unsupported_extension_is_unprocessable() {
    let h = harness();
    let response = post_upload(&h.router, &[Part::File { name: "notes.txt", body: b"hello" }]).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}
