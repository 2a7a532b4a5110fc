#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use molva::TopicPattern;

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    pattern: String,
    topic: String,
}

fuzz_target!(|input: FuzzInput| {
    // компиляция не должна паниковать ни на каком входе
    if let Ok(pattern) = TopicPattern::compile(&input.pattern) {
        // сопоставление тотально и детерминировано
        let first = pattern.matches(&input.topic);
        let second = pattern.matches(&input.topic);
        assert_eq!(first, second);
        // точный шаблон совпадает сам с собой
        if pattern.is_exact() {
            assert!(pattern.matches(&input.pattern));
        }
    }
});
