use crate::config::ControllerConfig;
use crate::status::{LampColor, OperatingMode, ServerStatus};
use crate::traits::{ApiError, ApiResult, ControllerApi};
use anyhow::Result;
use log::debug;
use reqwest::blocking::{Client, Response};
use reqwest::header::CACHE_CONTROL;
use std::time::Duration;

/// `ControllerApi` over the signal controller's HTTP endpoints.
pub struct HttpControllerApi {
    client: Client,
    base_url: String,
}

impl HttpControllerApi {
    pub fn new(config: &ControllerConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;
        Ok(HttpControllerApi {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get(&self, path: &str, query: &[(&str, String)]) -> ApiResult<Response> {
        let url = self.endpoint(path);
        debug!("GET {} {:?}", url, query);
        let mut req = self.client.get(&url).header(CACHE_CONTROL, "no-store");
        if !query.is_empty() {
            req = req.query(query);
        }
        req.send().map_err(|e| ApiError::Transport(e.to_string()))
    }

    /// Send a command; any non-success status is a rejection carrying the body.
    fn command(&self, path: &str, query: &[(&str, String)]) -> ApiResult<()> {
        let resp = self.get(path, query)?;
        if resp.status().is_success() {
            return Ok(());
        }
        Err(ApiError::Rejected(rejection_text(resp)))
    }
}

fn rejection_text(resp: Response) -> String {
    let status = resp.status();
    let body = resp.text().unwrap_or_default();
    let body = body.trim();
    if body.is_empty() {
        status.to_string()
    } else {
        body.to_string()
    }
}

impl ControllerApi for HttpControllerApi {
    fn poll(&self) -> ApiResult<ServerStatus> {
        let resp = self.get("/status", &[])?;
        if !resp.status().is_success() {
            return Err(ApiError::Rejected(rejection_text(resp)));
        }
        let body = resp.text().map_err(|e| ApiError::Transport(e.to_string()))?;
        serde_json::from_str(&body).map_err(|e| ApiError::Malformed(e.to_string()))
    }

    fn set_mode(&self, mode: OperatingMode) -> ApiResult<()> {
        self.command("/mode", &[("set", mode.as_query().to_string())])
    }

    fn set_timing(&self, green_s: u32, yellow_s: u32) -> ApiResult<()> {
        self.command(
            "/timing",
            &[("g", green_s.to_string()), ("y", yellow_s.to_string())],
        )
    }

    fn set_lamp(&self, lamp_id: u32, color: LampColor) -> ApiResult<()> {
        self.command(
            "/set",
            &[("lamp", lamp_id.to_string()), ("color", color.code().to_string())],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::thread;

    /// Serve one canned HTTP response and report the request line.
    fn serve_once(status_line: &'static str, body: &'static str) -> (String, mpsc::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut chunk).expect("read");
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }
            let request = String::from_utf8_lossy(&buf).to_string();
            let first = request.lines().next().unwrap_or_default().to_string();
            let _ = tx.send(first);
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).expect("write");
        });

        (format!("http://{}", addr), rx)
    }

    fn api_for(base_url: String) -> HttpControllerApi {
        HttpControllerApi::new(&ControllerConfig {
            base_url,
            request_timeout_ms: 2_000,
        })
        .expect("client")
    }

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let api = api_for("http://192.168.4.1/".to_string());
        assert_eq!(api.endpoint("/status"), "http://192.168.4.1/status");
    }

    #[test]
    fn test_poll_decodes_status() {
        let (url, rx) = serve_once(
            "200 OK",
            r#"{"mode":"auto","phase":"A_Y","t_remain_ms":900,"timing":{"g":20,"y":3,"r":23},"lamps":[{"lamp":1,"color":"Y"}]}"#,
        );
        let status = api_for(url).poll().expect("poll failed");

        assert_eq!(rx.recv().unwrap(), "GET /status HTTP/1.1");
        assert_eq!(status.mode, OperatingMode::Auto);
        assert_eq!(status.remaining_secs(), 0);
        assert_eq!(status.lamps[0].color, LampColor::Yellow);
    }

    #[test]
    fn test_poll_malformed_payload() {
        let (url, _rx) = serve_once("200 OK", "<html>oops</html>");
        match api_for(url).poll() {
            Err(ApiError::Malformed(_)) => {}
            other => panic!("expected malformed, got {:?}", other),
        }
    }

    #[test]
    fn test_lamp_command_query_and_rejection() {
        let (url, rx) = serve_once("409 Conflict", "not in manual mode");
        let result = api_for(url).set_lamp(3, LampColor::Green);

        assert_eq!(rx.recv().unwrap(), "GET /set?lamp=3&color=G HTTP/1.1");
        assert_eq!(result, Err(ApiError::Rejected("not in manual mode".into())));
    }

    #[test]
    fn test_mode_command_success() {
        let (url, rx) = serve_once("200 OK", "");
        assert_eq!(api_for(url).set_mode(OperatingMode::Manual), Ok(()));
        assert_eq!(rx.recv().unwrap(), "GET /mode?set=manual HTTP/1.1");
    }

    #[test]
    fn test_unreachable_controller_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        match api_for(format!("http://{}", addr)).set_timing(30, 4) {
            Err(ApiError::Transport(_)) => {}
            other => panic!("expected transport error, got {:?}", other),
        }
    }
}
