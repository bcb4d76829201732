mod decode_test;
mod filters_test;
mod source_test;
mod surface_test;
mod unwrap_test;
