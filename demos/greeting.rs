use originserve::{serve_one, Level, Limits, Logger, Response, Router};
use std::io::BufReader;
use std::net::TcpListener;

fn greeting(lang: &str) -> Option<&'static str> {
    match lang {
        "en" => Some(r#"{"lang": "en", "text": "Hello, world!"}"#),
        "zh" => Some(r#"{"lang": "zh", "text": "你好世界！"}"#),
        "es" => Some(r#"{"lang": "es", "text": "¡Hola Mundo!"}"#),
        "ar" => Some(r#"{"lang": "ar", "text": "مرحبا بالعالم!"}"#),
        "pt" => Some(r#"{"lang": "pt", "text": "Olá, mundo!"}"#),
        "hi" => Some(r#"{"lang": "hi", "text": "हैलो वर्ल्ड!"}"#),
        "ru" => Some(r#"{"lang": "ru", "text": "Привет, мир!"}"#),
        _ => None,
    }
}

fn main() {
    let mut router = Router::new();

    router.add_route(
        "GET",
        "^/api$",
        Box::new(|_req| {
            Response::new(200, "OK")
                .header("Content-Type", "application/json")
                .body(r#"{"supported_lang": ["en", "zh", "es", "ar", "pt", "hi", "ru"]}"#)
        }),
    );

    router.add_route(
        "GET",
        "^/api/([a-z]+)$",
        Box::new(|req| {
            let lang = req.matches.first().map(String::as_str).unwrap_or("");
            match greeting(lang) {
                Some(text) => Response::new(200, "OK").header("Content-Type", "application/json").body(text),
                None => Response::new(404, "Not Found")
                    .header("Content-Type", "application/json")
                    .body(r#"{"error": "Language not supported", "status": "Not Found"}"#),
            }
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:8080").unwrap();
    for stream in listener.incoming() {
        let stream = match stream {
            Ok(stream) => stream,
            Err(_) => continue,
        };
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut logger = Logger::new(std::io::stderr(), "greeting", Level::Info);
        serve_one(&mut reader, stream, &mut logger, &router, Limits::default()).ok();
    }
}
