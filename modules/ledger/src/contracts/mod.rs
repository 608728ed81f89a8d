pub mod posting_request_v1;
