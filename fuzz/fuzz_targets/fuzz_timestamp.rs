#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Any input maps to a timestamp or 0, never a panic
    let _ = clas12_geometry::ccdb::parse_timestamp(data);
});
