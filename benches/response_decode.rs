//! Benchmarks for decoding and reshaping FogBugz search results

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fogbugz_mcp::attachments::rewrite_case_attachments;
use fogbugz_mcp::client::interpret_response;
use fogbugz_mcp::outline::build_outline;
use fogbugz_mcp::xml::{list_at, owned_list_at};
use serde_json::Value;

fn search_response(count: usize) -> String {
    let mut xml = format!(r#"<?xml version="1.0" encoding="UTF-8"?><response><cases count="{}">"#, count);
    for i in 1..=count {
        let parent = if i == 1 { 0 } else { i / 4 + 1 };
        xml.push_str(&format!(
            r#"<case ixBug="{i}" operations="edit,assign,resolve"><ixBugParent>{parent}</ixBugParent><sTitle><![CDATA[Case number {i}]]></sTitle><sStatus><![CDATA[Active]]></sStatus><sPersonAssignedTo><![CDATA[Ada Lovelace]]></sPersonAssignedTo><events><event ixBugEvent="{i}"><rgAttachments><attachment><sFileName>log{i}.txt</sFileName><sURL>default.asp?pg=pgDownload&amp;ixAttachment={i}&amp;sTicket=abc</sURL></attachment></rgAttachments></event></events></case>"#
        ));
    }
    xml.push_str("</cases></response>");
    xml
}

fn bench_interpret_response(c: &mut Criterion) {
    let mut group = c.benchmark_group("interpret_response");

    for count in [10, 100, 1000] {
        let body = search_response(count);
        group.throughput(Throughput::Bytes(body.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &body, |b, body| {
            b.iter(|| interpret_response(200, black_box(body)).unwrap())
        });
    }

    group.finish();
}

fn bench_build_outline(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_outline");

    for count in [100, 1000] {
        let resp = interpret_response(200, &search_response(count)).unwrap();
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &resp, |b, resp| {
            b.iter(|| {
                let cases = list_at(resp, &["cases", "case"]);
                build_outline(black_box(&cases), 1)
            })
        });
    }

    group.finish();
}

fn bench_rewrite_attachments(c: &mut Criterion) {
    let resp = interpret_response(200, &search_response(100)).unwrap();
    let cases = Value::Array(owned_list_at(&resp, &["cases", "case"]));

    c.bench_function("rewrite_case_attachments_100", |b| {
        b.iter(|| {
            rewrite_case_attachments(
                black_box(&cases),
                Some("https://acme.fogbugz.com"),
                Some("tok-1234567890"),
            )
        })
    });
}

criterion_group!(
    benches,
    bench_interpret_response,
    bench_build_outline,
    bench_rewrite_attachments
);
criterion_main!(benches);
