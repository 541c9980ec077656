//! Human-readable rendering of results. JSON output bypasses this module.

use std::fmt::Write;

use elec_core::calculations::{
    BoxFillResult, CalculationOutcome, ConduitFillResult, DwellingLoadResult, VoltageDropResult,
};
use elec_core::code_tables::TableSummary;
use elec_core::job::{Job, RecalcReport};

const RULE: &str = "═══════════════════════════════════════";

fn status_icon(pass: bool) -> &'static str {
    if pass {
        "[OK]"
    } else {
        "[FAIL]"
    }
}

fn header(out: &mut String, title: &str) {
    let _ = writeln!(out, "{}", RULE);
    let _ = writeln!(out, "  {}", title);
    let _ = writeln!(out, "{}", RULE);
}

pub fn render_box_fill(r: &BoxFillResult) -> String {
    let mut out = String::new();
    header(&mut out, "BOX FILL (NEC 314.16)");
    let _ = writeln!(out, "Box:        {} {}", r.box_type, r.dimensions);
    let _ = writeln!(out, "Volume:     {:.2} in³", r.box_volume_in3);
    let _ = writeln!(out);
    for c in &r.components {
        let _ = writeln!(
            out,
            "  {:<28} {:>3} × {:>5.2} = {:>6.2} in³",
            c.description, c.quantity, c.allowance_per_unit_in3, c.volume_in3
        );
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "Required:   {:.2} in³", r.total_required_volume_in3);
    let _ = writeln!(out, "Remaining:  {:.2} in³", r.remaining_volume_in3);
    let _ = writeln!(out, "Fill:       {:.1}% {}", r.fill_percentage, status_icon(r.within_limits));
    out
}

pub fn render_conduit_fill(r: &ConduitFillResult) -> String {
    let mut out = String::new();
    header(&mut out, "CONDUIT FILL (NEC Chapter 9)");
    let _ = writeln!(out, "Raceway:    {} {}", r.conduit_type, r.trade_size);
    let _ = writeln!(out, "Area:       {:.4} in²", r.conduit_area_sq_in);
    let _ = writeln!(out);
    for w in &r.wires {
        let _ = writeln!(
            out,
            "  {:>3} × {:<10} {:<5} {:.4} = {:.4} in²",
            w.quantity,
            w.gauge.as_str(),
            w.insulation.code().to_uppercase(),
            w.area_per_wire_sq_in,
            w.total_area_sq_in
        );
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "Conductors: {}", r.conductor_count);
    let _ = writeln!(out, "Occupied:   {:.4} in²", r.total_conductor_area_sq_in);
    let _ = writeln!(
        out,
        "Allowed:    {:.4} in² ({:.0}%)",
        r.max_allowed_area_sq_in, r.allowed_fill_percentage
    );
    let _ = writeln!(out, "Fill:       {:.1}% {}", r.fill_percentage, status_icon(r.within_limits));
    out
}

pub fn render_dwelling_load(r: &DwellingLoadResult) -> String {
    let mut out = String::new();
    header(&mut out, "DWELLING LOAD (NEC Article 220)");
    for a in &r.appliances {
        let tag = match (a.is_motor_load, a.is_largest_motor) {
            (true, true) => " (largest motor)",
            (true, false) => " (motor)",
            _ => "",
        };
        let _ = writeln!(
            out,
            "  {:>2} × {:<24} {:>8.0} VA {:>6.1} A{}",
            a.quantity, a.name, a.connected_va, a.amps, tag
        );
    }
    if !r.appliances.is_empty() {
        let _ = writeln!(out);
    }
    let _ = writeln!(out, "General lighting:  {:>10.0} VA", r.general_lighting_va);
    let _ = writeln!(out, "  after demand:    {:>10.0} VA", r.lighting_demand_va);
    let _ = writeln!(out, "Appliances:        {:>10.0} VA (after demand factors)", r.appliance_va);
    let _ = writeln!(out, "Largest motor:     {:>10.0} VA (125%)", r.largest_motor_va);
    let _ = writeln!(out, "Other motors:      {:>10.0} VA", r.other_motor_va);
    let _ = writeln!(out, "Total:             {:>10.0} VA", r.total_va);
    let _ = writeln!(out, "Connected:         {:>10.0} VA", r.connected_va);
    let _ = writeln!(out);
    let _ = writeln!(out, "Service current:   {:.1} A", r.total_amps);
    let _ = writeln!(out, "Minimum service:   {} A", r.recommended_service_amps);
    out
}

pub fn render_voltage_drop(r: &VoltageDropResult) -> String {
    let mut out = String::new();
    header(&mut out, "VOLTAGE DROP (NEC Chapter 9, Tables 8 and 9)");
    let _ = writeln!(out, "Resistance: {:.4} Ω/kft", r.resistance_ohms_per_kft);
    let _ = writeln!(out, "Reactance:  {:.4} Ω/kft", r.reactance_ohms_per_kft);
    let _ = writeln!(out, "Impedance:  {:.4} Ω (whole run)", r.circuit_impedance_ohms);
    let _ = writeln!(out);
    let _ = writeln!(out, "Drop:       {:.2} V", r.voltage_drop_volts);
    let _ = writeln!(out, "At load:    {:.2} V", r.end_voltage);
    if let Some(max) = r.max_length_ft {
        let _ = writeln!(out, "Max run:    {:.0} ft at {:.1}%", max, r.limit_percent);
    }
    let _ = writeln!(
        out,
        "Drop:       {:.2}% (limit {:.1}%) {}",
        r.voltage_drop_percent,
        r.limit_percent,
        status_icon(r.within_limits)
    );
    out
}

pub fn render_outcome(outcome: &CalculationOutcome) -> String {
    match outcome {
        CalculationOutcome::BoxFill(r) => render_box_fill(r),
        CalculationOutcome::ConduitFill(r) => render_conduit_fill(r),
        CalculationOutcome::DwellingLoad(r) => render_dwelling_load(r),
        CalculationOutcome::VoltageDrop(r) => render_voltage_drop(r),
    }
}

fn verdict(result: Option<bool>) -> &'static str {
    match result {
        Some(pass) => status_icon(pass),
        None => "[NOT CALCULATED]",
    }
}

pub fn render_job(job: &Job) -> String {
    let mut out = String::new();
    header(&mut out, &format!("JOB {}", job.meta.job_number));
    let _ = writeln!(out, "Client:     {}", job.meta.client);
    let _ = writeln!(out, "Owner:      {}", job.meta.owner);
    let _ = writeln!(out, "Code:       {}", job.settings.code_edition);
    let _ = writeln!(out, "Modified:   {}", job.meta.modified.format("%Y-%m-%d %H:%M UTC"));
    let _ = writeln!(out, "Catalog:    {} wire(s), {} appliance(s)", job.wires.len(), job.appliances.len());
    let _ = writeln!(out);

    let mut boxes: Vec<_> = job.box_fills.values().collect();
    boxes.sort_by(|a, b| a.label.cmp(&b.label));
    for r in boxes {
        let detail = r
            .result
            .as_ref()
            .map(|res| format!("{:.1}% of {:.2} in³", res.fill_percentage, res.box_volume_in3))
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "  box      {:<20} {:<24} {}",
            r.label,
            detail,
            verdict(r.result.as_ref().map(|res| res.within_limits))
        );
    }

    let mut conduits: Vec<_> = job.conduit_fills.values().collect();
    conduits.sort_by(|a, b| a.label.cmp(&b.label));
    for r in conduits {
        let detail = r
            .result
            .as_ref()
            .map(|res| format!("{:.1}% (cap {:.0}%)", res.fill_percentage, res.allowed_fill_percentage))
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "  conduit  {:<20} {:<24} {}",
            r.label,
            detail,
            verdict(r.result.as_ref().map(|res| res.within_limits))
        );
    }

    let mut dwellings: Vec<_> = job.dwelling_loads.values().collect();
    dwellings.sort_by(|a, b| a.label.cmp(&b.label));
    for r in dwellings {
        let detail = r
            .result
            .as_ref()
            .map(|res| format!("{:.0} VA, {:.1} A", res.total_va, res.total_amps))
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "  dwelling {:<20} {:<24} {}",
            r.label,
            detail,
            verdict(r.result.as_ref().map(|_| true))
        );
    }

    let mut drops: Vec<_> = job.voltage_drops.values().collect();
    drops.sort_by(|a, b| a.label.cmp(&b.label));
    for r in drops {
        let detail = r
            .result
            .as_ref()
            .map(|res| format!("{:.2} V, {:.2}%", res.voltage_drop_volts, res.voltage_drop_percent))
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "  drop     {:<20} {:<24} {}",
            r.label,
            detail,
            verdict(r.result.as_ref().map(|res| res.within_limits))
        );
    }
    out
}

pub fn render_reports(reports: &[RecalcReport]) -> String {
    let mut out = String::new();
    for report in reports {
        let status = match &report.error {
            Some(e) => format!("[ERROR] {}", e),
            None => verdict(report.within_limits).to_string(),
        };
        let _ = writeln!(out, "  {:<14} {:<20} {}", report.kind.name(), report.label, status);
    }
    let failed = reports.iter().filter(|r| !r.is_ok()).count();
    let _ = writeln!(out);
    let _ = writeln!(out, "{} record(s) recalculated, {} failed", reports.len(), failed);
    out
}

pub fn render_tables(summary: &TableSummary) -> String {
    let mut out = String::new();
    header(&mut out, &format!("CODE TABLES: {}", summary.edition));
    let _ = writeln!(out, "Box fill gauges:     {}", summary.conductor_volume_gauges.join(", "));
    let _ = writeln!(out, "Standard boxes:      {}", summary.standard_boxes);
    let _ = writeln!(out, "Conductor areas:     {}", summary.conductor_area_entries);
    let _ = writeln!(out, "Raceway areas:       {}", summary.conduit_area_entries);
    let _ = writeln!(
        out,
        "Fill caps:           {:.0}% / {:.0}% / {:.0}% (1 / 2 / over 2 conductors)",
        summary.fill_caps.one_conductor,
        summary.fill_caps.two_conductors,
        summary.fill_caps.over_two_conductors
    );
    let _ = writeln!(out, "Lighting load:       {} VA/ft²", summary.lighting_va_per_sq_ft);
    let _ = writeln!(out, "Resistances:         {}", summary.resistance_entries);
    let _ = writeln!(out, "Voltage drop limit:  {:.1}%", summary.voltage_drop_limit_percent);
    let _ = writeln!(out, "Demand factors:");
    for bracket in &summary.demand_brackets {
        let bound = bracket
            .up_to_va
            .map(|v| format!("up to {:.0} VA", v))
            .unwrap_or_else(|| "remainder".to_string());
        let _ = writeln!(out, "  {:<18} {:.0}%", bound, bracket.factor * 100.0);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use elec_core::calculations::{
        box_fill, dwelling_load, voltage_drop, ApplianceSpec, BoxDescriptor, CircuitDescriptor,
        DwellingDescriptor,
    };
    use elec_core::categories::BoxType;
    use elec_core::code_tables::CodeTables;
    use elec_core::gauge::Gauge;
    use elec_core::wire::WireSpec;

    #[test]
    fn test_box_fill_rendering() {
        let fourteen = Gauge::parse("14").unwrap();
        let result = box_fill::calculate(
            &BoxDescriptor::with_volume(BoxType::Device, "3x2x3.5", 18.0),
            &[WireSpec::wire(fourteen.clone(), 2), WireSpec::ground(fourteen, 1)],
        )
        .unwrap();
        let text = render_box_fill(&result);
        assert!(text.contains("33.3%"));
        assert!(text.contains("[OK]"));
    }

    #[test]
    fn test_dwelling_rendering_marks_largest_motor() {
        let result = dwelling_load::calculate(
            &DwellingDescriptor::new("House", 1500.0, 240),
            &[ApplianceSpec::motor("Disposal", 1000.0, 120.0, 1)],
        )
        .unwrap();
        let text = render_dwelling_load(&result);
        assert!(text.contains("(largest motor)"));
        assert!(text.contains("4775 VA"));
    }

    #[test]
    fn test_voltage_drop_rendering() {
        let circuit =
            CircuitDescriptor::single_phase(Gauge::parse("12").unwrap(), 100.0, 20.0, 120.0);
        let result = voltage_drop::calculate(&circuit).unwrap();
        let text = render_voltage_drop(&result);
        assert!(text.contains("7.72 V"));
        assert!(text.contains("112.28 V"));
        assert!(text.contains("6.43% (limit 3.0%) [FAIL]"));
        assert!(text.contains("Max run:    47 ft"));
    }

    #[test]
    fn test_tables_rendering() {
        let text = render_tables(&CodeTables::nec_2023().summary());
        assert!(text.contains("NEC 2023"));
        assert!(text.contains("Voltage drop limit:  3.0%"));
        assert!(text.contains("53% / 31% / 40%"));
        assert!(text.contains("remainder"));
    }

    #[test]
    fn test_empty_job_rendering() {
        let job = Job::new("Owner", "24-009", "Client");
        let text = render_job(&job);
        assert!(text.contains("JOB 24-009"));
        assert!(text.contains("0 wire(s)"));
    }
}
