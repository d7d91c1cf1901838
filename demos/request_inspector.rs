use originserve::{drain_body, serve_one, Level, Limits, Logger, Response, Router};
use std::io::BufReader;
use std::net::TcpListener;

fn main() {
    let mut router = Router::new();
    router.add_route(
        "GET",
        "^/.*$",
        Box::new(|req| {
            let user_agent = req
                .headers
                .get("user-agent")
                .map(|f| format!(r#", "user_agent": {:?}"#, f.unvalidated().join(",")))
                .unwrap_or_default();
            let content_type = req
                .headers
                .get("content-type")
                .map(|f| format!(r#", "content_type": {:?}"#, f.unvalidated().join(",")))
                .unwrap_or_default();
            let cookies = req
                .cookies
                .iter()
                .map(|c| format!("{}={}", c.name, c.value))
                .collect::<Vec<_>>()
                .join(";");

            let body = std::mem::replace(&mut req.body, originserve::Body::None);
            let bytes = drain_body(body).unwrap_or_default();

            let result = format!(
                r#"{{"method": "{}", "path": {:?}{user_agent}{content_type}, "cookies": {:?}, "body": {:?}}}"#,
                req.method,
                req.path,
                cookies,
                String::from_utf8_lossy(&bytes),
            );

            Response::new(200, "OK").header("Content-Type", "application/json").body(result)
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:8080").unwrap();
    for stream in listener.incoming() {
        let stream = match stream {
            Ok(stream) => stream,
            Err(_) => continue,
        };
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut logger = Logger::new(std::io::stderr(), "request_inspector", Level::Info);
        serve_one(&mut reader, stream, &mut logger, &router, Limits::default()).ok();
    }
}
