//! Serial and parallel row iteration.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::bind::Bound;
use crate::error::{DmlError, DmlResult, ResultExt};
use crate::exec::{QueryExecPreparer, RawRow, RowCursor};
use crate::pool;
use crate::record::ColumnMap;

async fn scan_rows<F>(cursor: &mut dyn RowCursor, f: &mut F) -> DmlResult<u64>
where
    F: FnMut(&mut ColumnMap) -> DmlResult<()>,
{
    let mut cm = pool::column_map();
    cm.set_columns(cursor.column_names()?);
    let mut count = 0;
    while cursor.next().await? {
        count += 1;
        let mut row = RawRow::with_capacity(cm.columns().len());
        cursor.scan(&mut row)?;
        cm.set_row(count, row);
        f(&mut *cm).context_with(|| format!("row {count}"))?;
    }
    Ok(count)
}

/// Feed every row to `f` on the calling task, in order. The cursor is
/// closed on every path. Returns the row count.
pub async fn serial<F>(mut cursor: Box<dyn RowCursor>, mut f: F) -> DmlResult<u64>
where
    F: FnMut(&mut ColumnMap) -> DmlResult<()>,
{
    let scanned = scan_rows(cursor.as_mut(), &mut f).await;
    let closed = cursor.close().await;
    let count = scanned?;
    closed?;
    Ok(count)
}

/// Read rows and hand them to the workers until the cursor is exhausted or
/// the token fires.
async fn produce(
    cursor: &mut dyn RowCursor,
    tx: &mpsc::Sender<(u64, RawRow)>,
    token: &CancellationToken,
) -> DmlResult<u64> {
    let mut count = 0;
    while !token.is_cancelled() && cursor.next().await? {
        count += 1;
        let mut row = RawRow::new();
        cursor.scan(&mut row)?;
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            sent = tx.send((count, row)) => {
                // every worker is gone
                if sent.is_err() {
                    break;
                }
            }
        }
    }
    Ok(count)
}

/// Feed rows to `concurrency` workers running `f`.
///
/// Rows are dispatched in cursor order but complete in any order;
/// [`ColumnMap::count`] carries each row's ordinal. The first failing worker
/// stops dispatch, every error is collected and reported together. The
/// cursor is closed and all workers joined before this returns.
pub async fn parallel<F>(
    mut cursor: Box<dyn RowCursor>,
    concurrency: usize,
    cancel: &CancellationToken,
    f: F,
) -> DmlResult<()>
where
    F: Fn(&mut ColumnMap) -> DmlResult<()> + Send + Sync + 'static,
{
    if concurrency < 1 {
        let _ = cursor.close().await;
        return Err(out_of_range(concurrency));
    }
    let columns = match cursor.column_names() {
        Ok(columns) => Arc::new(columns),
        Err(e) => {
            let _ = cursor.close().await;
            return Err(e);
        }
    };

    let token = cancel.child_token();
    let (tx, rx) = mpsc::channel::<(u64, RawRow)>(1);
    let rx = Arc::new(Mutex::new(rx));
    let f = Arc::new(f);
    let mut workers = JoinSet::new();
    for worker in 0..concurrency {
        let rx = Arc::clone(&rx);
        let f = Arc::clone(&f);
        let token = token.clone();
        let columns = Arc::clone(&columns);
        workers.spawn(async move {
            let mut cm = pool::column_map();
            cm.set_columns(columns.to_vec());
            loop {
                let next = {
                    let mut rx = rx.lock().await;
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => None,
                        row = rx.recv() => row,
                    }
                };
                let Some((count, row)) = next else {
                    return Ok(());
                };
                cm.set_row(count, row);
                if let Err(e) = f(&mut *cm) {
                    tracing::warn!(worker, row = count, "row callback failed: {e}");
                    token.cancel();
                    return Err(e.context(format!("row {count}")));
                }
            }
        });
    }
    drop(rx);

    let produced = produce(cursor.as_mut(), &tx, &token).await;
    drop(tx);
    let closed = cursor.close().await;

    let mut errors = Vec::new();
    if let Err(e) = produced {
        errors.push(e);
    }
    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => errors.push(e),
            Err(e) => errors.push(DmlError::execution(format!("row worker failed: {e}"))),
        }
    }
    if let Err(e) = closed {
        errors.push(e);
    }
    if errors.is_empty() && cancel.is_cancelled() {
        errors.push(DmlError::execution("row iteration cancelled"));
    }
    match DmlError::combine(errors) {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn out_of_range(concurrency: usize) -> DmlError {
    DmlError::out_of_range(format!(
        "concurrency must be at least 1, got {concurrency}"
    ))
}

impl Bound<'_> {
    /// Run the query and feed each row to `f` in order.
    pub async fn iterate_serial<F>(&mut self, db: &dyn QueryExecPreparer, f: F) -> DmlResult<u64>
    where
        F: FnMut(&mut ColumnMap) -> DmlResult<()>,
    {
        let cursor = self.query(db).await?;
        serial(cursor, f).await
    }

    /// Run the query and process its rows on `concurrency` workers.
    pub async fn iterate_parallel<F>(
        &mut self,
        db: &dyn QueryExecPreparer,
        concurrency: usize,
        cancel: &CancellationToken,
        f: F,
    ) -> DmlResult<()>
    where
        F: Fn(&mut ColumnMap) -> DmlResult<()> + Send + Sync + 'static,
    {
        if concurrency < 1 {
            return Err(out_of_range(concurrency));
        }
        let cursor = self.query(db).await?;
        parallel(cursor, concurrency, cancel, f).await
    }
}
