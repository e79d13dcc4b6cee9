// Integration tests

mod middleware_test;
mod purchase_flow_test;
mod service_test;
mod support;
