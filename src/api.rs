use crate::engine;
use crate::engine::{RunResult, Table};
use crate::error::Error;
use crate::{Value, ValueOptions};

/// Options that affect a matching run.
#[derive(Debug, Clone)]
pub struct Options {
    /// Bound on same-line `Continue` re-evaluations per input line. A
    /// template exceeding it aborts with a
    /// [`MatchRuntimeError`](crate::MatchRuntimeError) — the guard exists for
    /// template-author loops, not correct templates.
    pub continue_limit: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options { continue_limit: 64 }
    }
}

/// A parsed, validated, compiled template.
///
/// Construction runs the whole front half of the pipeline (parse → validate
/// → compile); a `Template` that exists is executable. The handle is
/// immutable and safe to share across threads — each [`run`](Template::run)
/// owns its own transient state.
#[derive(Debug)]
pub struct Template {
    compiled: engine::CompiledTemplate,
}

impl Template {
    /// Parse template text into an executable template.
    ///
    /// # Example
    /// ```
    /// use tabula::Template;
    ///
    /// let template = Template::parse(
    ///     "Value NAME (\\S+)\nStart\n  ^interface ${NAME} -> Record\n",
    /// )
    /// .unwrap();
    /// assert_eq!(template.header(), ["NAME"]);
    /// ```
    pub fn parse(text: &str) -> Result<Template, Error> {
        let def = engine::parse(text)?;
        engine::validate(&def)?;
        let compiled = engine::CompiledTemplate::compile(def)?;
        Ok(Template { compiled })
    }

    /// Declared value names in declaration order (the record schema).
    pub fn header(&self) -> Vec<String> {
        self.compiled.header()
    }

    /// Declared values with their options.
    pub fn values(&self) -> &[Value] {
        &self.compiled.values
    }

    /// Names of values declared with the `Key` option.
    pub fn key_columns(&self) -> Vec<String> {
        self.compiled.key_columns()
    }

    /// Run the template over `input` with default [`Options`].
    pub fn run(&self, input: &str) -> Result<Table, Error> {
        self.run_with(input, &Options::default())
    }

    /// Run the template over `input`.
    pub fn run_with(&self, input: &str, options: &Options) -> Result<Table, Error> {
        Ok(self.run_with_metrics(input, options)?.table)
    }

    /// Run the template over `input` and keep the run counters.
    ///
    /// Use this to observe how much of the input a template consumed
    /// (skipped lines are normal, not errors) without changing behavior.
    pub fn run_with_metrics(&self, input: &str, options: &Options) -> Result<RunResult, Error> {
        let executor = engine::Executor::new(&self.compiled, options.continue_limit);
        Ok(executor.run(input)?)
    }

    /// True when any declared value carries `options`.
    pub fn has_option(&self, options: ValueOptions) -> bool {
        self.compiled.values.iter().any(|v| v.options.intersects(options))
    }
}

/// Parse `template` and run it over `input` in one call.
///
/// Convenience for one-shot extraction; reuse a [`Template`] when running
/// the same template against many inputs.
pub fn extract(template: &str, input: &str) -> Result<Table, Error> {
    Template::parse(template)?.run(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CellValue;

    const INTERFACE_TEMPLATE: &str = "\
Value Key INTERFACE (\\S+)
Value IP_ADDRESS (\\S+)
Value MAC_ADDRESS ([0-9a-f:]+)
Value VRF (\\S+)
Value MTU (\\d+)
Value STATE_LINK (\\S+)

Start
  ^${INTERFACE}\\s+${IP_ADDRESS}\\s+${MAC_ADDRESS}\\s+${VRF}\\s+${MTU}\\s+${STATE_LINK} -> Record
";

    #[test]
    fn interface_table_round_trip() {
        let template = Template::parse(INTERFACE_TEMPLATE).unwrap();
        let table =
            template.run("eth0 10.0.0.1 00:0c:29:09:fa:f7 default 1500 up\n").unwrap();

        assert_eq!(table.len(), 1);
        let record = table.get(0).unwrap();
        let expected = [
            ("INTERFACE", "eth0"),
            ("IP_ADDRESS", "10.0.0.1"),
            ("MAC_ADDRESS", "00:0c:29:09:fa:f7"),
            ("VRF", "default"),
            ("MTU", "1500"),
            ("STATE_LINK", "up"),
        ];
        for (name, value) in expected {
            assert_eq!(record.get(name).unwrap(), &CellValue::Scalar(value.to_string()), "{name}");
        }
    }

    #[test]
    fn schema_is_complete_on_every_record() {
        let template = Template::parse(INTERFACE_TEMPLATE).unwrap();
        let table = template
            .run("header line\neth0 10.0.0.1 00:0c:29:09:fa:f7 default 1500 up\n")
            .unwrap();

        assert_eq!(template.header(), table.header());
        for record in table.records() {
            assert_eq!(record.len(), template.header().len());
        }
        assert_eq!(table.key_columns(), ["INTERFACE"]);
    }

    #[test]
    fn extract_is_parse_then_run() {
        let table = extract(
            INTERFACE_TEMPLATE,
            "eth0 10.0.0.1 00:0c:29:09:fa:f7 default 1500 up\n\
             eth1 10.0.1.1 00:0c:29:09:fa:f8 mgmt 9000 down\n",
        )
        .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(1).unwrap().get("VRF").unwrap().as_str(), Some("mgmt"));
    }

    #[test]
    fn multi_block_interface_listing_with_address_lists() {
        let template = r"
Value Required,Key INTERFACE ([a-z][\w.]*)
Value List ADDRESSES ([0-9a-fA-F:.]+/\d+)
Value STATE_ADMIN (u|D|A)
Value STATE_LINK (u|D|A)
Value DESCRIPTION (\S.*)

Start
  ^Codes:.*
  ^Interface\s+IP Address\s+S/L\s+Description
  ^-+\s+.*
  ^[a-z][\w.]*\s.* -> Continue, Record
  ^${INTERFACE}\s+${ADDRESSES}\s+${STATE_ADMIN}/${STATE_LINK}\s+${DESCRIPTION}
  ^${INTERFACE}\s+${ADDRESSES}\s+${STATE_ADMIN}/${STATE_LINK}\s*
  ^\s+${ADDRESSES}\s*
";
        let input = "\
Codes: S - State, L - Link
Interface        IP Address         S/L  Description
---------        ----------         ---  -----------
eth0             10.0.0.90/24       u/u  WAN uplink
eth1             192.168.1.1/24     u/D
lo               127.0.0.1/8        u/u
                 ::1/128
";
        let table = extract(template, input).unwrap();
        assert_eq!(table.len(), 3);

        let eth0 = table.get(0).unwrap();
        assert_eq!(eth0.get("INTERFACE").unwrap().as_str(), Some("eth0"));
        assert_eq!(eth0.get("ADDRESSES").unwrap().as_list().unwrap(), ["10.0.0.90/24".to_string()]);
        assert_eq!(eth0.get("DESCRIPTION").unwrap().as_str(), Some("WAN uplink"));

        let eth1 = table.get(1).unwrap();
        assert_eq!(eth1.get("STATE_LINK").unwrap().as_str(), Some("D"));
        assert_eq!(eth1.get("DESCRIPTION").unwrap().as_str(), Some(""));

        // The trailing loopback block is flushed at end of input, with the
        // indented continuation line folded into its address list.
        let lo = table.get(2).unwrap();
        assert_eq!(lo.get("INTERFACE").unwrap().as_str(), Some("lo"));
        assert_eq!(
            lo.get("ADDRESSES").unwrap().as_list().unwrap(),
            ["127.0.0.1/8".to_string(), "::1/128".to_string()]
        );
    }

    #[test]
    fn validation_failure_precedes_any_matching() {
        let broken = "Value X (.)\nStart\n  ^a -> Nowhere\n";
        match Template::parse(broken) {
            Err(Error::Validation(_)) => {}
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn metrics_agree_with_the_table() {
        let template = Template::parse(INTERFACE_TEMPLATE).unwrap();
        let result = template
            .run_with_metrics(
                "banner\neth0 10.0.0.1 00:0c:29:09:fa:f7 default 1500 up\ntrailer\n",
                &Options::default(),
            )
            .unwrap();

        assert_eq!(result.metrics.lines, 3);
        assert_eq!(result.metrics.matched_lines, 1);
        assert_eq!(result.metrics.skipped_lines, 2);
        assert_eq!(result.metrics.records, result.table.len());
    }

    #[test]
    fn option_introspection() {
        let template = Template::parse(INTERFACE_TEMPLATE).unwrap();
        assert!(template.has_option(ValueOptions::KEY));
        assert!(!template.has_option(ValueOptions::FILLDOWN));
        assert_eq!(template.values()[0].options, ValueOptions::KEY);
    }
}
