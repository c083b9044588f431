//! Run configuration: directive parsing and cycle-phase predicates.
//!
//! The grammar is a newline-delimited, whitespace-tokenized text format —
//! not TOML — because it must match the plusarg-driven config file the
//! surrounding RTL simulator passes in. See spec.md §4.1 for the directive
//! table this mirrors.

use crate::error::ConfigError;

/// A single configured traffic flow: `ingress -> egress` at `rate` flits/cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Flow {
    pub ingress_id: u64,
    pub egress_id: u64,
    pub rate: f32,
}

/// Parsed run configuration, shared read-only for the lifetime of a run.
#[derive(Debug, Clone)]
pub struct Params {
    pub num_ingresses: u64,
    pub num_egresses: u64,

    pub warmup_cycles: u64,
    pub measurement_cycles: u64,
    pub drain_timeout_cycles: u64,

    pub flits_per_packet: u64,
    pub required_throughput: f32,
    pub required_median_latency: u64,
    pub required_max_latency: u64,

    pub flows: Vec<Flow>,

    pub netrace_enable: bool,
    pub netrace_trace: String,
    pub netrace_region: u32,
    pub netrace_ignore_dependencies: bool,
}

/// Fallback configuration used when no `+eval_params=` path is supplied.
pub const DEFAULT_CONFIG: &str = "\
warmup 1000
measurement 2000
drain 500
flits_per_packet 4
required_throughput 0.0
required_median_latency 99999
required_max_latency 99999
netrace_enable false
netrace_trace blackscholes_64c_simsmall.tra.bz2
netrace_region 0
netrace_ignore_dependencies false
flow 0 0 1.0
";

const EVAL_PARAMS_PLUSARGS: [&str; 2] = ["+eval_params=", "+EVAL_PARAMS="];

impl Params {
    /// Resolve the config source: scan `args` for a `+eval_params=`/
    /// `+EVAL_PARAMS=` plusarg and read that file, otherwise fall back to
    /// `fallback`. Mirrors the original `init_params` plusarg scan.
    pub fn resolve<I, S>(args: I, fallback: &str) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut path = None;
        for arg in args {
            let arg = arg.as_ref();
            for prefix in EVAL_PARAMS_PLUSARGS {
                if let Some(rest) = arg.strip_prefix(prefix) {
                    path = Some(rest.to_string());
                }
            }
        }

        match path {
            Some(path) => {
                tracing::info!(%path, "constructing params from config file");
                let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
                    path: path.clone(),
                    source,
                })?;
                Self::parse(&text)
            }
            None => {
                tracing::info!("no eval_params plusarg found, using fallback config");
                Self::parse(fallback)
            }
        }
    }

    /// Parse the directive grammar described in spec.md §4.1.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut warmup_cycles = 1000u64;
        let mut measurement_cycles = 2000u64;
        let mut drain_timeout_cycles = 500u64;
        let mut flits_per_packet = 4u64;
        let mut required_throughput = 0.0f32;
        let mut required_median_latency = 99999u64;
        let mut required_max_latency = 99999u64;
        let mut netrace_enable = false;
        let mut netrace_trace = "blackscholes_64c_simsmall.tra.bz2".to_string();
        let mut netrace_region = 0u32;
        let mut netrace_ignore_dependencies = false;

        let mut flows = Vec::new();
        let mut num_ingresses = 0u64;
        let mut num_egresses = 0u64;

        for (idx, raw_line) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let tokens: Vec<&str> = line.split_whitespace().collect();
            let directive = tokens[0];
            let rest = &tokens[1..];

            macro_rules! arity {
                ($n:expr) => {
                    if rest.len() != $n {
                        return Err(ConfigError::BadArity {
                            line: line_no,
                            directive: directive.to_string(),
                            expected: $n,
                            got: rest.len(),
                        });
                    }
                };
            }
            macro_rules! num {
                ($idx:expr, $ty:ty) => {
                    rest[$idx].parse::<$ty>().map_err(|_| ConfigError::BadNumber {
                        line: line_no,
                        directive: directive.to_string(),
                        value: rest[$idx].to_string(),
                    })?
                };
            }

            match directive {
                "warmup" => {
                    arity!(1);
                    warmup_cycles = num!(0, u64);
                }
                "measurement" => {
                    arity!(1);
                    measurement_cycles = num!(0, u64);
                }
                "drain" => {
                    arity!(1);
                    drain_timeout_cycles = num!(0, u64);
                }
                "flits_per_packet" => {
                    arity!(1);
                    flits_per_packet = num!(0, u64);
                }
                "required_throughput" => {
                    arity!(1);
                    required_throughput = num!(0, f32);
                }
                "required_median_latency" => {
                    arity!(1);
                    required_median_latency = num!(0, u64);
                }
                "required_max_latency" => {
                    arity!(1);
                    required_max_latency = num!(0, u64);
                }
                "netrace_enable" => {
                    arity!(1);
                    netrace_enable = rest[0] == "true";
                }
                "netrace_trace" => {
                    arity!(1);
                    netrace_trace = rest[0].to_string();
                }
                "netrace_region" => {
                    arity!(1);
                    netrace_region = num!(0, u32);
                    if netrace_region >= 5 {
                        return Err(ConfigError::BadRegion(netrace_region));
                    }
                }
                "netrace_ignore_dependencies" => {
                    arity!(1);
                    netrace_ignore_dependencies = rest[0] == "true";
                }
                "flow" => {
                    arity!(3);
                    let ingress_id = num!(0, u64);
                    let egress_id = num!(1, u64);
                    let rate = num!(2, f32);
                    num_ingresses = num_ingresses.max(ingress_id + 1);
                    num_egresses = num_egresses.max(egress_id + 1);
                    flows.push(Flow {
                        ingress_id,
                        egress_id,
                        rate,
                    });
                }
                other => {
                    return Err(ConfigError::UnknownDirective {
                        line: line_no,
                        directive: other.to_string(),
                    });
                }
            }
        }

        if flows.is_empty() && !netrace_enable {
            return Err(ConfigError::NoFlows);
        }

        Ok(Params {
            num_ingresses,
            num_egresses,
            warmup_cycles,
            measurement_cycles,
            drain_timeout_cycles,
            flits_per_packet,
            required_throughput,
            required_median_latency,
            required_max_latency,
            flows,
            netrace_enable,
            netrace_trace,
            netrace_region,
            netrace_ignore_dependencies,
        })
    }

    pub fn in_warmup(&self, cycle: u64) -> bool {
        cycle < self.warmup_cycles
    }

    pub fn in_measurement(&self, cycle: u64) -> bool {
        !self.in_warmup(cycle) && cycle < self.warmup_cycles + self.measurement_cycles
    }

    pub fn in_drain(&self, cycle: u64) -> bool {
        !self.in_warmup(cycle) && !self.in_measurement(cycle)
    }

    pub fn timed_out(&self, cycle: u64) -> bool {
        cycle > self.warmup_cycles + self.measurement_cycles + self.drain_timeout_cycles
    }

    /// Flows rooted at a given ingress, in configuration order.
    pub fn flows_for_ingress(&self, ingress_id: u64) -> impl Iterator<Item = &Flow> {
        self.flows.iter().filter(move |f| f.ingress_id == ingress_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_default_config() {
        let p = Params::parse(DEFAULT_CONFIG).unwrap();
        assert_eq!(p.warmup_cycles, 1000);
        assert_eq!(p.measurement_cycles, 2000);
        assert_eq!(p.drain_timeout_cycles, 500);
        assert_eq!(p.flits_per_packet, 4);
        assert_eq!(p.flows.len(), 1);
        assert_eq!(p.num_ingresses, 1);
        assert_eq!(p.num_egresses, 1);
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let text = "# a comment\n\nwarmup 10\n\nflow 0 0 1.0\n";
        let p = Params::parse(text).unwrap();
        assert_eq!(p.warmup_cycles, 10);
    }

    #[test]
    fn unknown_directive_is_fatal() {
        let err = Params::parse("bogus 1\n").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownDirective { .. }));
    }

    #[test]
    fn wrong_arity_is_fatal() {
        let err = Params::parse("warmup 1 2\n").unwrap_err();
        assert!(matches!(err, ConfigError::BadArity { .. }));
    }

    #[test]
    fn no_flows_without_netrace_is_fatal() {
        let err = Params::parse("warmup 10\n").unwrap_err();
        assert!(matches!(err, ConfigError::NoFlows));
    }

    #[test]
    fn netrace_enabled_does_not_require_flows() {
        let p = Params::parse("netrace_enable true\n").unwrap();
        assert!(p.netrace_enable);
    }

    #[test]
    fn num_ingresses_and_egresses_derived_from_flows() {
        let p = Params::parse("flow 0 0 1.0\nflow 2 3 0.5\n").unwrap();
        assert_eq!(p.num_ingresses, 3);
        assert_eq!(p.num_egresses, 4);
    }

    #[test]
    fn phase_predicates() {
        let p = Params::parse("warmup 10\nmeasurement 20\ndrain 5\nflow 0 0 1.0\n").unwrap();
        assert!(p.in_warmup(0));
        assert!(!p.in_warmup(10));
        assert!(p.in_measurement(10));
        assert!(p.in_measurement(29));
        assert!(!p.in_measurement(30));
        assert!(p.in_drain(30));
        assert!(!p.timed_out(35));
        assert!(p.timed_out(36));
    }

    #[test]
    fn bad_region_rejected() {
        let err = Params::parse("netrace_enable true\nnetrace_region 5\n").unwrap_err();
        assert!(matches!(err, ConfigError::BadRegion(5)));
    }
}
