#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use std::collections::BTreeMap;

#[derive(Arbitrary, Debug)]
struct Options {
    pairs: Vec<(String, String)>,
}

fuzz_target!(|input: Options| {
    let options: BTreeMap<String, String> = input.pairs.into_iter().collect();
    if let Ok(req) = clas12_geometry::request::GeometryRequest::from_options(&options) {
        let _ = req.validate();
        let _ = req.cache_key();
        let _ = req.info();
    }
});
