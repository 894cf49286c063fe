//! Pre-built status pages for testing.
//!
//! These mirror what a php-fpm pool with two workers prints for each of
//! the four `?json` / `?full` combinations.

use super::fetcher::MockFetcher;

/// Basic JSON page (`?json`).
pub const STATUS_JSON: &str = r#"{"pool":"www","process manager":"dynamic","start time":1549045407,"start since":1392,"accepted conn":21,"listen queue":0,"max listen queue":0,"listen queue len":128,"idle processes":1,"active processes":1,"total processes":2,"max active processes":1,"max children reached":0,"slow requests":0}"#;

/// Full JSON page (`?json&full`).
pub const STATUS_FULL_JSON: &str = r#"{"pool":"www","process manager":"dynamic","start time":1549045407,"start since":1401,"accepted conn":22,"listen queue":0,"max listen queue":0,"listen queue len":128,"idle processes":1,"active processes":1,"total processes":2,"max active processes":1,"max children reached":0,"slow requests":0, "processes":[{"pid":67,"state":"Idle","start time":1549045407,"start since":1401,"requests":11,"request duration":834,"request method":"GET","request uri":"/status?json&full","content length":0,"user":"-","script":"-","last request cpu":0.00,"last request memory":2093045},{"pid":68,"state":"Running","start time":1549045407,"start since":1401,"requests":11,"request duration":919,"request method":"GET","request uri":"/status?json&full","content length":0,"user":"-","script":"-","last request cpu":10.00,"last request memory":2097152}]}"#;

/// Basic text page.
pub const STATUS_TEXT: &str = "\
pool:                 www
process manager:      dynamic
start time:           01/Feb/2019:18:23:27 +0000
start since:          1389
accepted conn:        19
listen queue:         0
max listen queue:     0
listen queue len:     128
idle processes:       1
active processes:     1
total processes:      2
max active processes: 1
max children reached: 0
slow requests:        0
";

/// Full text page (`?full`).
pub const STATUS_FULL_TEXT: &str = "\
pool:                 www
process manager:      dynamic
start time:           01/Feb/2019:18:23:27 +0000
start since:          1397
accepted conn:        20
listen queue:         0
max listen queue:     0
listen queue len:     128
idle processes:       1
active processes:     1
total processes:      2
max active processes: 1
max children reached: 0
slow requests:        0

************************
pid:                  67
state:                Idle
start time:           01/Feb/2019:18:23:27 +0000
start since:          1397
requests:             10
request duration:     834
request method:       GET
request URI:          /status?full
content length:       0
user:                 -
script:               -
last request cpu:     0.00
last request memory:  2093045

************************
pid:                  68
state:                Running
start time:           01/Feb/2019:18:23:27 +0000
start since:          1397
requests:             10
request duration:     919
request method:       GET
request URI:          /status?full
content length:       0
user:                 -
script:               -
last request cpu:     10.00
last request memory:  2097152
";

/// Body that is not a status page in either format.
pub const GARBAGE: &str = "hello and goodbye\nfrom someone\nfoobar";

impl MockFetcher {
    /// Serves `body` with `200 OK` at `url`.
    pub fn serving(url: &str, body: &str) -> Self {
        let mut fetcher = Self::new();
        fetcher.add_body(url, body);
        fetcher
    }

    /// A pool that exposes all four status variants under one host.
    pub fn typical_pool() -> Self {
        let mut fetcher = Self::new();
        fetcher.add_response(
            "http://127.0.0.1/status?json",
            200,
            "application/json",
            STATUS_JSON,
        );
        fetcher.add_response(
            "http://127.0.0.1/status?full&json",
            200,
            "application/json",
            STATUS_FULL_JSON,
        );
        fetcher.add_body("http://127.0.0.1/status", STATUS_TEXT);
        fetcher.add_body("http://127.0.0.1/status?full", STATUS_FULL_TEXT);
        fetcher
    }
}
