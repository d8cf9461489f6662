use std::io;
use std::sync::Arc;
use std::thread;

use concurrent_store::impls::mem_store::MemStore;
use concurrent_store::model::Node;
use concurrent_store::model::Triple;
use concurrent_store::model::TriplePattern;
use concurrent_store::PrefixMapping;
use concurrent_store::ReadWriteLockingStore;
use futures_util::StreamExt;

#[tokio::main]
async fn main() -> io::Result<()> {
    // Wrap an in-memory store so that it can be shared between threads
    let store = Arc::new(ReadWriteLockingStore::new(MemStore::new()));

    let mut prefixes = store.prefix_mapping();
    prefixes.set_ns_prefix("ex", "https://ex.com#")?;

    let ex = |local: &str| Node::iri(prefixes.expand_prefix(&format!("ex:{}", local)));

    for i in 0..5 {
        store.add(Triple::new(
            ex(&format!("s{}", i)),
            ex("knows"),
            Node::literal(i),
        ))?;
    }

    // Lazy: the store is not read until the first record is asked for
    let mut it = store.find(TriplePattern::new(None, Some(ex("knows")), None))?;
    if let Some(first) = it.next() {
        println!("First: {}", first?);
    }

    // A writer on another thread does not wait for `it` to be consumed
    let writer = {
        let store = Arc::clone(&store);
        thread::spawn(move || store.clear())
    };
    writer.join().expect("writer panicked")?;

    // `it` still produces the records that were there when it started
    for t in it {
        println!("Rest: {}", t?);
    }

    // Streams work the same way
    store.add(Triple::new(ex("a"), ex("knows"), ex("b")))?;
    let mut strm = store.stream_all()?;
    while let Some(result) = strm.next().await {
        let t = result?;
        if let Node::Iri(subject) = &t.subject {
            println!("Streamed: {} {}", prefixes.short_form(subject), t.object);
        }
    }

    println!("Size: {}", store.size()?);
    Ok(())
}
