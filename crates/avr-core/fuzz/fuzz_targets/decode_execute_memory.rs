#![no_main]

use avr_core::{
    validate_data_access, validate_eeprom_access, validate_flash_access, CoreConfig, Decoder,
    ErrorPolicy, ExecuteFlags, Machine,
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < 8 {
        return;
    }

    let word = u16::from_le_bytes([data[0], data[1]]);
    let addr = u16::from_le_bytes([data[2], data[3]]);
    let budget = u64::from(data[4]) * 16;
    let policy = match data[5] % 3 {
        0 => ErrorPolicy::LogAndContinue,
        1 => ErrorPolicy::Halt,
        _ => ErrorPolicy::Propagate,
    };

    let _ = Decoder::decode(word);
    let _ = validate_data_access(addr);
    let _ = validate_eeprom_access(addr);
    let _ = validate_flash_access(u32::from(addr));

    let mut machine = Machine::new(CoreConfig {
        error_policy: policy,
        range_checks: data[6] & 1 == 0,
        ..CoreConfig::default()
    });
    machine.load_flash(&data[8..]);
    let _ = machine.execute(budget, ExecuteFlags::default());

    let bytes = machine.snapshot(true);
    let mut copy = Machine::default();
    assert!(copy.restore(&bytes).is_ok());
    assert_eq!(copy.snapshot(true), bytes);
});
