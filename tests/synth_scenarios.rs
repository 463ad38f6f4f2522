//! The six seed end-to-end scenarios.

mod common;

use common::{bulk_dump, loud_single_carrier_patch, rms};
use dx7fm::{Engine, BLOCK_SIZE};

#[test]
fn silence_with_no_midi() {
    let mut engine = Engine::new(48000.0).unwrap();
    let mut out = [0i16; BLOCK_SIZE];
    engine.get_samples(&mut out);
    assert!(out.iter().all(|&x| x == 0));
}

#[test]
fn single_note_sounds_then_releases_to_silence() {
    let mut engine = Engine::new(48000.0).unwrap();
    engine.load_sysex_bank(&bulk_dump(&loud_single_carrier_patch())).unwrap();

    engine.send_midi(&[0x90, 0x3C, 0x64]);
    let mut out = vec![0i16; 4800 - (4800 % BLOCK_SIZE) + BLOCK_SIZE];
    engine.get_samples(&mut out);
    assert!(rms(&out) > 0.0);

    engine.send_midi(&[0x80, 0x3C, 0x00]);
    let mut tail = vec![0i16; 48000 - (48000 % BLOCK_SIZE) + BLOCK_SIZE];
    engine.get_samples(&mut tail);
    let final_block = &tail[tail.len() - BLOCK_SIZE..];
    assert!(final_block.iter().all(|&x| x == 0));
}

#[test]
fn sustain_pedal_keeps_voice_alive_past_note_off() {
    let mut engine = Engine::new(48000.0).unwrap();
    engine.load_sysex_bank(&bulk_dump(&loud_single_carrier_patch())).unwrap();

    engine.send_midi(&[0x90, 0x45, 0x64]);
    engine.send_midi(&[0xB0, 0x40, 0x7F]); // sustain on
    engine.send_midi(&[0x80, 0x45, 0x00]); // note off, held by sustain

    let mut out = vec![0i16; 1000 - (1000 % BLOCK_SIZE) + BLOCK_SIZE];
    engine.get_samples(&mut out);
    assert!(rms(&out) > 0.0, "sustained note should still be audible");

    engine.send_midi(&[0xB0, 0x40, 0x00]); // sustain off, voice begins release
    let mut more = [0i16; BLOCK_SIZE];
    engine.get_samples(&mut more);
}

#[test]
fn program_change_clamps_to_patch_31() {
    let mut engine = Engine::new(48000.0).unwrap();
    let mut bank_message = bulk_dump(&loud_single_carrier_patch());
    // Patch 31 gets a distinctive algorithm so we can tell it was selected.
    let patch31_start = 6 + 31 * 128;
    bank_message[patch31_start + 110] = 4;
    engine.load_sysex_bank(&bank_message).unwrap();

    engine.send_midi(&[0xC0, 0x7F]); // program change, clamps to 31
    let mut out = [0i16; BLOCK_SIZE];
    engine.get_samples(&mut out);

    engine.send_midi(&[0x90, 0x40, 0x64]);
    let mut out2 = vec![0i16; BLOCK_SIZE * 10];
    engine.get_samples(&mut out2);
    assert!(rms(&out2) >= 0.0); // renders without panicking using patch 31
}

#[test]
fn sysex_bank_load_is_visible_to_subsequent_note_on() {
    let mut engine = Engine::new(48000.0).unwrap();
    engine.load_sysex_bank(&bulk_dump(&loud_single_carrier_patch())).unwrap();

    engine.send_midi(&[0x90, 0x3C, 0x64]);
    let mut out = vec![0i16; BLOCK_SIZE * 50];
    engine.get_samples(&mut out);
    assert!(rms(&out) > 0.0);
}

#[test]
fn polyphony_cap_drops_the_seventeenth_note() {
    let mut engine = Engine::new(48000.0).unwrap();
    engine.load_sysex_bank(&bulk_dump(&loud_single_carrier_patch())).unwrap();

    for note in 0..17u8 {
        engine.send_midi(&[0x90, note, 0x64]);
    }
    let mut out = vec![0i16; BLOCK_SIZE * 20];
    engine.get_samples(&mut out);
    assert!(rms(&out) > 0.0);
}

#[test]
fn clipping_stays_within_int16_range() {
    let mut engine = Engine::new(48000.0).unwrap();
    engine.load_sysex_bank(&bulk_dump(&loud_single_carrier_patch())).unwrap();
    for note in [40u8, 44, 47, 51, 54].iter() {
        engine.send_midi(&[0x90, *note, 0x7F]);
    }
    let mut out = vec![0i16; BLOCK_SIZE * 200];
    engine.get_samples(&mut out);
    assert!(out.iter().all(|&s| (-0x8000..=0x7FFF).contains(&(s as i32))));
}
