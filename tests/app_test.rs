#![cfg(feature = "web")]

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use image::GenericImageView;
use popyramid::app::{MAX_UPLOAD_BYTES, router};
use popyramid::loader;
use serde_json::Value;
use tower::ServiceExt;

const BOUNDARY: &str = "popyramid-test-boundary";

const CENSUS_CSV: &str = "\
Age group,Male,Female
30-34,3.9,3.8
25-29,4.2,4.0
20-24,4.4,4.1
15-19,4.6,4.3
10-14,4.5,4.1
5-9,4.9,4.6
0-4,5.3,4.9
";

// Builds a multipart/form-data body with an optional file part and a config part.
fn multipart_body(file: Option<(&str, &[u8])>, config: &str) -> Vec<u8> {
    let mut body = Vec::new();
    if let Some((name, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n",
                BOUNDARY, name
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"config\"\r\n\r\n{}\r\n--{}--\r\n",
            BOUNDARY, config, BOUNDARY
        )
        .as_bytes(),
    );
    body
}

async fn post(uri: &str, file: Option<(&str, &[u8])>, config: &str) -> Response {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(file, config)))
        .unwrap();
    router().oneshot(request).await.unwrap()
}

async fn get(uri: &str) -> Response {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    router().oneshot(request).await.unwrap()
}

async fn body_bytes(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

fn header_value(response: &Response, name: header::HeaderName) -> String {
    response
        .headers()
        .get(name)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn render_returns_preview_and_chart() {
    let response = post("/api/render", Some(("census.csv", CENSUS_CSV.as_bytes())), "").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["preview"]["headers"][0], "Age group");
    assert_eq!(json["preview"]["rows"].as_array().unwrap().len(), 5);
    assert_eq!(json["preview"]["total_rows"], 7);
    assert_eq!(json["preview"]["rows"][0][1], "3.9");

    let svg = json["svg"].as_str().unwrap();
    assert!(svg.starts_with("<svg"));
    assert!(svg.contains(">5.30%</text>"));
    assert!(svg.contains(">6%</text>"));

    assert_eq!(json["export"]["width"], 1200);
    assert_eq!(json["export"]["height"], 700);
    assert_eq!(json["export"]["png_width"], 3750);
}

#[tokio::test]
async fn render_uses_configured_columns_and_mm_size() {
    let csv = "Band,Men,Women\n0-4,1.5,1.25\n";
    let config = r#"{
        "chart": { "columns": { "age": "Band", "left": "Men", "right": "Women" } },
        "export": { "unit": "mm", "width_mm": 150, "height_mm": 100, "dpi": 300 }
    }"#;
    let response = post("/api/render", Some(("bands.csv", csv.as_bytes())), config).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["export"]["width"], 1772);
    assert_eq!(json["export"]["height"], 1181);
    assert_eq!(json["export"]["png_scale"], 3.125);
    assert!(json["svg"].as_str().unwrap().contains(r#"width="1772""#));
}

#[tokio::test]
async fn missing_column_lists_all_required_names() {
    let csv = "Age group,Male,Women\n0-4,5.3,4.9\n";
    let response = post("/api/render", Some(("census.csv", csv.as_bytes())), "").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["status"], "error");
    let message = json["message"].as_str().unwrap();
    assert!(message.contains("Female"));
    assert!(message.contains("Age group, Male, Female"));

    // The real headers come back so the user can spot the typo.
    assert_eq!(json["preview"]["headers"][2], "Women");
    assert_eq!(json["preview"]["rows"][0][0], "0-4");
    assert_eq!(json["preview"]["total_rows"], 1);
}

#[tokio::test]
async fn head_counts_are_rejected_with_a_message() {
    let csv = "Age group,Male,Female\n0-4,2000000,1900000\n";
    let response = post("/api/render", Some(("census.csv", csv.as_bytes())), "").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert!(json["message"].as_str().unwrap().contains("too large"));
    assert_eq!(json["preview"]["rows"][0][1], "2000000");
}

#[tokio::test]
async fn unreadable_file_has_no_preview() {
    let response = post("/api/render", Some(("census.xlsx", &b"not a workbook"[..])), "").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await.get("preview").is_none());
}

#[tokio::test]
async fn non_numeric_value_is_a_bad_request() {
    let csv = "Age group,Male,Female\n0-4,5.3,4.9\n5-9,n/a,4.6\n";
    let response = post("/api/render", Some(("census.csv", csv.as_bytes())), "").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let message = body_json(response).await["message"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(message.contains("'Male', row 2"), "{}", message);
}

#[tokio::test]
async fn upload_without_file_is_rejected() {
    let response = post("/api/render", None, "").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Failed to load spreadsheet: No file data received");
}

#[tokio::test]
async fn oversized_upload_is_refused_without_json() {
    let body = vec![b'x'; MAX_UPLOAD_BYTES + 1];
    let request = Request::builder()
        .method("POST")
        .uri("/api/render")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .header(header::CONTENT_LENGTH, body.len())
        .body(Body::from(body))
        .unwrap();
    let response = router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    // The page must not parse this body as JSON.
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(!content_type.contains("application/json"));
}

#[tokio::test]
async fn out_of_range_option_is_rejected() {
    let response = post(
        "/api/render",
        Some(("census.csv", CENSUS_CSV.as_bytes())),
        r#"{"export": {"dpi": 100}}"#,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(
        body_json(response).await["message"]
            .as_str()
            .unwrap()
            .contains("export.dpi")
    );
}

#[tokio::test]
async fn png_export_is_scaled_by_dpi() {
    let config = r#"{"export": {"width_px": 500, "height_px": 300, "dpi": 192}}"#;
    let response = post(
        "/api/export/png",
        Some(("census.csv", CENSUS_CSV.as_bytes())),
        config,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_value(&response, header::CONTENT_TYPE), "image/png");

    let png = image::load_from_memory(&body_bytes(response).await).unwrap();
    assert_eq!(png.dimensions(), (1000, 600));
}

#[tokio::test]
async fn pdf_export_is_a_pdf_document() {
    let response = post(
        "/api/export/pdf",
        Some(("census.csv", CENSUS_CSV.as_bytes())),
        "",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_value(&response, header::CONTENT_TYPE), "application/pdf");
    assert!(body_bytes(response).await.starts_with(b"%PDF"));
}

#[tokio::test]
async fn svg_export_is_named_after_the_title() {
    let response = post(
        "/api/export/svg",
        Some(("census.csv", CENSUS_CSV.as_bytes())),
        r#"{"chart": {"title": "Census 2020"}}"#,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        header_value(&response, header::CONTENT_DISPOSITION),
        "attachment; filename=\"Census_pyramid.svg\"; filename*=UTF-8''Census_pyramid.svg"
    );

    let svg = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(svg.contains(">Census 2020</text>"));
}

#[tokio::test]
async fn unknown_export_format_is_rejected() {
    let response = post(
        "/api/export/gif",
        Some(("census.csv", CENSUS_CSV.as_bytes())),
        "",
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(
        body_json(response).await["message"]
            .as_str()
            .unwrap()
            .contains("unknown export format 'gif'")
    );
}

#[tokio::test]
async fn template_workbook_loads_back() {
    let response = get("/api/template").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(header_value(&response, header::CONTENT_DISPOSITION).contains("pyramid_template.xlsx"));

    let bytes = body_bytes(response).await;
    let table = loader::load_table("pyramid_template.xlsx", &bytes).unwrap();
    assert_eq!(table.headers, vec!["Age group", "Male", "Female"]);
    assert_eq!(table.row_count(), 18);
}

#[tokio::test]
async fn form_page_and_defaults_are_served() {
    let response = get("/").await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(page.contains(r#"name="chart.x_axis.tick_direction""#));
    assert!(page.contains(r#"accept=".xlsx,.xlsm,.xls,.ods,.csv""#));
    // Non-JSON error bodies are reported by status, and downloads keep their
    // object URL alive until the browser has read it.
    assert!(page.contains(r#"type.includes("application/json")"#));
    assert!(page.contains("setTimeout(() => URL.revokeObjectURL(href)"));
    assert!(page.contains("if (result.preview) showPreview(result.preview);"));

    let json = body_json(get("/api/defaults").await).await;
    assert_eq!(json["chart"]["title"], "Population Pyramid");
    assert_eq!(json["chart"]["left_color"], "#3B82F6");
    assert_eq!(json["export"]["unit"], "px");
}
