use std::io::Write;
use std::time::Instant;

use async_std::stream::StreamExt;
use criterion::async_executor::AsyncStdExecutor;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use csv_seek::{DelimitedFile, ReadByRow};
use rand::distributions::Uniform;
use rand::Rng;
use tempfile::NamedTempFile;

fn test_file(rows: usize) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "id,name,amount,comment").unwrap();
    for i in 0..rows {
        writeln!(file, "{},\"name {}\",{}.{},\"row, number {}\"", i, i, i * 3, i % 100, i).unwrap();
    }
    file.flush().unwrap();
    file
}

fn random_rows_bench(c: &mut Criterion) {
    let tmp = test_file(50_000);
    let path = tmp.path().to_path_buf();

    c.bench_function("read random rows", |b| {
        let path = path.clone();
        b.to_async(AsyncStdExecutor).iter_custom(move |iters| {
            let path = path.clone();
            async move {
                let file = DelimitedFile::open(&path, 0, true).await.unwrap();

                let rows: Vec<_> = rand::thread_rng()
                    .sample_iter(Uniform::new(0, file.row_count()))
                    .take(1_000)
                    .collect();

                let start = Instant::now();

                for _i in 0..iters {
                    for row in &rows {
                        black_box(file.row(black_box(*row)).await.unwrap());
                    }
                }

                start.elapsed()
            }
        });
    });
}

fn stream_bench(c: &mut Criterion) {
    let tmp = test_file(50_000);
    let path = tmp.path().to_path_buf();

    c.bench_function("stream all rows", |b| {
        let path = path.clone();
        b.to_async(AsyncStdExecutor).iter_custom(move |iters| {
            let path = path.clone();
            async move {
                let file = DelimitedFile::open(&path, 0, true).await.unwrap();

                let start = Instant::now();

                for _i in 0..iters {
                    let mut stream = file.rows(0, None).unwrap();
                    while let Some(row) = stream.next().await {
                        black_box(row);
                    }
                }

                start.elapsed()
            }
        });
    });
}

fn index_bench(c: &mut Criterion) {
    let tmp = test_file(200_000);
    let path = tmp.path().to_path_buf();

    c.bench_function("build index", |b| {
        let path = path.clone();
        b.to_async(AsyncStdExecutor).iter_custom(move |iters| {
            let path = path.clone();
            async move {
                let start = Instant::now();

                for _i in 0..iters {
                    let file = DelimitedFile::open(&path, 0, true).await.unwrap();
                    black_box(file.row_count());
                }

                start.elapsed()
            }
        });
    });
}

criterion_group!(benches, random_rows_bench, stream_bench, index_bench);
criterion_main!(benches);
