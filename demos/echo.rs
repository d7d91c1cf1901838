use originserve::{drain_body, serve_one, Level, Limits, Logger, Response, Router};
use std::io::BufReader;
use std::net::TcpListener;

fn main() {
    let mut router = Router::new();
    router.add_route(
        "POST",
        "^/.*$",
        Box::new(|req| {
            let body = std::mem::replace(&mut req.body, originserve::Body::None);
            let bytes = drain_body(body).unwrap_or_default();
            let text = String::from_utf8_lossy(&bytes);
            let result = format!(r#"{{"path": {:?}, "body": {:?}}}"#, req.path, text);

            Response::new(200, "OK")
                .header("Content-Type", "application/json")
                .body(result)
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:8080").unwrap();
    for stream in listener.incoming() {
        let stream = match stream {
            Ok(stream) => stream,
            Err(_) => continue,
        };
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut logger = Logger::new(std::io::stderr(), "echo", Level::Info);
        serve_one(&mut reader, stream, &mut logger, &router, Limits::default()).ok();
    }
}
