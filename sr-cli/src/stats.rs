//! Report display and formatting

use sr::sim::{ChannelStats, SimReport};

/// Format a ratio as a percentage
pub fn format_percent(part: u64, whole: u64) -> String {
    if whole == 0 {
        return "-".to_string();
    }
    format!("{:.1}%", part as f64 * 100.0 / whole as f64)
}

/// Format a tick count in human-readable form
pub fn format_ticks(ticks: u64) -> String {
    const K: u64 = 1_000;
    const M: u64 = K * 1_000;

    if ticks >= M {
        format!("{:.2}M ticks", ticks as f64 / M as f64)
    } else if ticks >= K {
        format!("{:.2}k ticks", ticks as f64 / K as f64)
    } else {
        format!("{} ticks", ticks)
    }
}

/// Payloads delivered per thousand ticks
pub fn goodput(report: &SimReport) -> f64 {
    let ticks = report.finished_at.ticks();
    if ticks == 0 {
        return 0.0;
    }
    report.delivered as f64 * 1_000.0 / ticks as f64
}

fn channel_row(name: &str, stats: &ChannelStats) -> String {
    format!(
        "│ {:<8} │ {:>8} │ {:>8} │ {:>9} │ {:>10} │",
        name, stats.offered, stats.lost, stats.corrupted, stats.duplicated
    )
}

/// Render a run report as a table
pub fn render_report(report: &SimReport) -> String {
    let status = if report.complete && report.exactly_once_in_order {
        "COMPLETE"
    } else if report.complete {
        "COMPLETE (ORDER VIOLATED)"
    } else {
        "INCOMPLETE"
    };

    let s = &report.sender;
    let r = &report.receiver;
    let lines = [
        "┌───────────────────────────────────────────────────────┐".to_string(),
        format!("│ RUN: {:<49}│", status),
        "├───────────────────────────────────────────────────────┤".to_string(),
        format!(
            "│ Finished at:      {:<36}│",
            format_ticks(report.finished_at.ticks())
        ),
        format!(
            "│ Delivered:        {:<36}│",
            format!("{} / {}", report.delivered, report.messages)
        ),
        format!(
            "│ Goodput:          {:<36}│",
            format!("{:.2} msgs / 1k ticks", goodput(report))
        ),
        "├───────────────────────────────────────────────────────┤".to_string(),
        format!("│ Packets sent:     {:<36}│", s.packets_sent),
        format!(
            "│ Retransmissions:  {:<36}│",
            format!(
                "{} ({})",
                s.retransmissions,
                format_percent(s.retransmissions, s.packets_sent)
            )
        ),
        format!(
            "│ ACKs received:    {:<36}│",
            format!(
                "{} ({} corrupted, {} stale)",
                s.acks_received, s.corrupted_acks, s.stale_acks
            )
        ),
        format!("│ Window full:      {:<36}│", s.rejected_submissions),
        format!(
            "│ Receiver:         {:<36}│",
            format!(
                "{} buffered, {} duplicate, {} corrupted",
                r.buffered_out_of_order, r.duplicate_packets, r.corrupted_packets
            )
        ),
        "├──────────┬──────────┬──────────┬───────────┬────────────┤".to_string(),
        "│ Channel  │ Offered  │ Lost     │ Corrupted │ Duplicated │".to_string(),
        "├──────────┼──────────┼──────────┼───────────┼────────────┤".to_string(),
        channel_row("data", &report.data_channel),
        channel_row("ack", &report.ack_channel),
        "└──────────┴──────────┴──────────┴───────────┴────────────┘".to_string(),
    ];
    lines.join("\n")
}

/// Print a run report
pub fn display_report(report: &SimReport) {
    println!("\n{}", render_report(report));
}

/// One-line summary
pub fn summary_line(report: &SimReport) -> String {
    format!(
        "[{}] delivered {}/{} | sent {} | retx {} | in order: {}",
        report.finished_at,
        report.delivered,
        report.messages,
        report.sender.packets_sent,
        report.sender.retransmissions,
        if report.exactly_once_in_order { "yes" } else { "no" }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use sr::sim::{SimConfig, Simulation};

    fn sample_report() -> SimReport {
        Simulation::new(SimConfig {
            messages: 10,
            ..Default::default()
        })
        .unwrap()
        .run()
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(1, 4), "25.0%");
        assert_eq!(format_percent(0, 10), "0.0%");
        assert_eq!(format_percent(3, 0), "-");
    }

    #[test]
    fn test_format_ticks() {
        assert_eq!(format_ticks(500), "500 ticks");
        assert_eq!(format_ticks(2_500), "2.50k ticks");
        assert_eq!(format_ticks(3_000_000), "3.00M ticks");
    }

    #[test]
    fn test_render_report() {
        let report = sample_report();
        let text = render_report(&report);
        assert!(text.contains("RUN: COMPLETE"));
        assert!(text.contains("10 / 10"));
        assert!(text.contains("│ data     │"));
    }

    #[test]
    fn test_summary_line() {
        let report = sample_report();
        let line = summary_line(&report);
        assert!(line.contains("delivered 10/10"));
        assert!(line.contains("in order: yes"));
    }
}
