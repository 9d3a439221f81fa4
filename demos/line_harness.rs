//! Line-driven device harness
//!
//! Reads a script from the file named on the command line, or stdin. The
//! first line is the device UUID. After that:
//!
//! - `<M2MXML ...>` parse the message
//! - `w<secs>` run behaviors for that many seconds
//! - `a` run every behavior once and require an outgoing message
//! - `n` run every behavior once and require silence
//! - `p` run behaviors until one is due or none remain
//! - `r<0|1>` whether parsed messages and waits must produce output
//! - `#...` comment
//!
//! Outgoing messages are written to stdout, one per line.
//!
//! ```text
//! RUST_LOG=m2mxml=debug cargo run --example line_harness -- script.txt
//! ```

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};

use m2mxml::device::{
    Device, Direction, Property, Transducer, analog_input_properties, device_properties,
    digital_input_properties, digital_output_properties,
};
use m2mxml::engine::{DeviceHandlers, Engine, EngineConfig};
use m2mxml::protocol::{CommandKind, Message, PerceptType, Properties, ResultCode, Timestamp};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Default)]
struct Console {
    acknowledged: bool,
}

impl DeviceHandlers for Console {
    fn handles(&self, kind: CommandKind) -> bool {
        kind != CommandKind::Unknown
    }

    fn log_error(&mut self, code: i32, description: &str) {
        eprintln!("Error {code}: {description}");
    }

    fn request_percept(
        &mut self,
        _transducer: &mut Transducer,
        timestamp: &mut Option<Timestamp>,
    ) -> ResultCode {
        *timestamp = None;
        ResultCode::SUCCESS
    }

    fn turn_on_off(
        &mut self,
        transducer: &mut Transducer,
        sense: bool,
        _properties: &Properties<'_>,
    ) -> ResultCode {
        transducer.update_value(if sense { "1" } else { "0" });
        ResultCode::SUCCESS
    }

    fn set_string_output(&mut self, transducer: &mut Transducer, value: &str) -> ResultCode {
        transducer.update_value(value);
        ResultCode::SUCCESS
    }

    fn set_analog_output(&mut self, transducer: &mut Transducer, set_point: f64) -> ResultCode {
        transducer.update_value(&format!("{set_point:.6}"));
        ResultCode::SUCCESS
    }

    fn reboot(&mut self, _device: &Device) -> ResultCode {
        info!("reboot requested");
        ResultCode::SUCCESS
    }

    fn query_configuration(&mut self, _address: Option<&str>, _property: &mut Property) -> ResultCode {
        ResultCode::SUCCESS
    }

    fn set_configuration(&mut self, _address: Option<&str>, _property: &mut Property) -> ResultCode {
        ResultCode::SUCCESS
    }

    fn send_message(&mut self, _device: &Device, message: &Message) {
        let mut stdout = io::stdout().lock();
        if writeln!(stdout, "{message}").is_ok() {
            self.acknowledged = true;
        }
    }
}

fn device(uuid: Option<&str>) -> Device {
    let point = |address: &str, label: &str, percept_type: PerceptType, direction: Direction| {
        Transducer::new(address, percept_type, direction)
            .with_label(label)
            .with_units("units")
    };
    Device::new(uuid)
        .with_properties(device_properties())
        .with_transducer(
            point("ain01", "Analog In #1", PerceptType::Analog, Direction::IN)
                .with_properties(analog_input_properties())
                .with_current_value("12.34"),
        )
        .with_transducer(point("aout01", "Analog Out #1", PerceptType::Analog, Direction::INOUT))
        .with_transducer(
            point("din01", "Digital In #1", PerceptType::Digital, Direction::IN)
                .with_properties(digital_input_properties())
                .with_current_value("0"),
        )
        .with_transducer(
            point("dout01", "Digital Out #1", PerceptType::Digital, Direction::OUT)
                .with_properties(digital_output_properties())
                .with_current_value("0"),
        )
        .with_transducer(point("sin01", "String In #1", PerceptType::String, Direction::IN))
        .with_transducer(point("sout01", "String Out #1", PerceptType::String, Direction::OUT))
        .with_transducer(
            point("lin01", "Location In #1", PerceptType::Location, Direction::IN)
                .with_current_value("12.34,56.78"),
        )
        .with_transducer(point("lout01", "Location Out #1", PerceptType::Location, Direction::OUT))
}

fn run_all(engine: &mut Engine<Console>) {
    for _ in 0..engine.count_behaviors() {
        engine.process_state();
    }
}

fn run_for(engine: &mut Engine<Console>, seconds: u64) {
    let deadline = Instant::now() + Duration::from_secs(seconds);
    loop {
        run_all(engine);
        let now = Instant::now();
        if now > deadline {
            break;
        }
        let pause = engine
            .process_state()
            .unwrap_or(Duration::MAX)
            .min(deadline - now)
            .min(Duration::from_millis(100));
        thread::sleep(pause);
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let input: Box<dyn BufRead> = match std::env::args().nth(1) {
        Some(path) => match File::open(&path) {
            Ok(file) => Box::new(BufReader::new(file)),
            Err(err) => {
                error!(%path, %err, "cannot open script");
                return ExitCode::FAILURE;
            }
        },
        None => Box::new(io::stdin().lock()),
    };

    let mut lines = input.lines().map_while(Result::ok);
    let uuid = lines.next().unwrap_or_default();
    let uuid = uuid.trim();
    let device = device((!uuid.is_empty()).then_some(uuid));
    let mut engine = match Engine::new(device, Console::default(), EngineConfig::default()) {
        Ok(engine) => engine,
        Err(err) => {
            error!(%err, "cannot start engine");
            return ExitCode::FAILURE;
        }
    };

    let mut require_acknowledgement = false;
    for line in lines {
        let line = line.trim_end();
        let Some(first) = line.chars().next() else {
            continue;
        };
        engine.handlers_mut().acknowledged = false;
        let arg = &line[first.len_utf8()..];
        let check = match first {
            '<' => {
                let _ = engine.parse_message(line.as_bytes());
                require_acknowledgement
            }
            'w' => {
                run_for(&mut engine, arg.trim().parse().unwrap_or(0));
                require_acknowledgement
            }
            'a' => {
                run_all(&mut engine);
                true
            }
            'n' => {
                run_all(&mut engine);
                if engine.handlers().acknowledged {
                    eprintln!("Nothing should have happened");
                    return ExitCode::FAILURE;
                }
                false
            }
            'p' => {
                while engine.process_state().is_some_and(|delay| !delay.is_zero()) {
                    thread::sleep(Duration::from_millis(100));
                }
                require_acknowledgement
            }
            'r' => {
                require_acknowledgement = arg.trim().parse::<i32>().is_ok_and(|flag| flag != 0);
                false
            }
            '#' => false,
            _ => {
                eprintln!("USAGE: [# ...]|[w<sec>]|[a]|[n]|[p]|[r#]|<M2MXML/>");
                false
            }
        };
        if check && !engine.handlers().acknowledged {
            eprintln!("Acknowledgement expected");
            return ExitCode::FAILURE;
        }
    }
    ExitCode::SUCCESS
}
