mod availability_test;
mod booking_test;
mod calendar_test;
mod chat_test;
mod health_test;
mod middleware_test;
