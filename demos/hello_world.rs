use originserve::{serve_one, Level, Limits, Logger, Response, Router};
use std::io::BufReader;
use std::net::TcpListener;

fn main() {
    let mut router = Router::new();
    router.add_route(
        "GET",
        "^/$",
        Box::new(|_req| {
            Response::new(200, "OK")
                .header("Content-Type", "text/plain")
                .body("Hello, world!")
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:8080").unwrap();
    for stream in listener.incoming() {
        let stream = match stream {
            Ok(stream) => stream,
            Err(_) => continue,
        };
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut logger = Logger::new(std::io::stderr(), "hello_world", Level::Info);
        serve_one(&mut reader, stream, &mut logger, &router, Limits::default()).ok();
    }
}
