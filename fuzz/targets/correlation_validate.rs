#![no_main]

use libfuzzer_sys::fuzz_target;

use molva::{is_valid_correlation_id, validate_correlation_id};

fuzz_target!(|value: String| {
    // обе формы проверки согласованы и не паникуют
    let verdict = validate_correlation_id(&value);
    assert_eq!(verdict.is_ok(), is_valid_correlation_id(&value));
});
