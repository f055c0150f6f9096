// SPDX-License-Identifier: Apache-2.0

//! Runs a default query against the host and prints every public surface
//! value, mirroring the quick-start usage shown in the crate's top-level
//! documentation.

fn main() {
    env_logger_init_if_available();

    let options = vmdetect::Options::builder().dynamic(true).build();

    println!("detect:      {}", vmdetect::detect(&options));
    println!("percentage:  {}%", vmdetect::percentage(&options));
    println!("brand:       {}", vmdetect::brand(&options));
    println!("type:        {}", vmdetect::type_of(&options));
    println!("conclusion:  {}", vmdetect::conclusion(&options));

    let detected = vmdetect::detected_enums(&options);
    if detected.is_empty() {
        println!("no techniques fired");
    } else {
        println!("fired techniques:");
        for id in detected {
            println!("  - {}", vmdetect::flag_to_string(id));
        }
    }

    let high_threshold = vmdetect::Options::builder().high_threshold(true).build();
    println!(
        "same host under HIGH_THRESHOLD: {}",
        vmdetect::detect(&high_threshold)
    );
}

/// `log`'s facade needs a subscriber to actually print anything; this
/// example works without one (every probe's `log::debug!`/`trace!` calls
/// simply go nowhere), but a real binary would install one here, e.g.
/// `env_logger::init()`.
fn env_logger_init_if_available() {}
